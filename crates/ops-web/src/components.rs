//! UI Components

use leptos::prelude::*;

use crate::api::ChatMessage;

/// Message bubble component
#[component]
pub fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let class = format!("message message-{}", message.role.as_str());

    view! {
        <div class=class>
            <span class="role">{message.role.label()}</span>
            <span class="time">{message.sent_at.clone()}</span>
            <p class="content">{message.content.clone()}</p>
        </div>
    }
}

/// Inline error shown above the input; dismissed on the next send
#[component]
pub fn ErrorBanner(message: String) -> impl IntoView {
    view! {
        <div class="error-banner" role="alert">
            <strong>"Request failed: "</strong>
            {message}
        </div>
    }
}
