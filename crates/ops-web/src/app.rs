//! Main App Component

use leptos::prelude::*;

use crate::pages::ChatPage;

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    view! {
        <main class="app">
            <header class="app-header">
                <h1>"Octanksson Turbines"</h1>
                <p class="tagline">"Manufacturing Operations Assistant"</p>
            </header>
            <ChatPage />
        </main>
    }
}
