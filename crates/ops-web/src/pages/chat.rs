//! Chat Page

use leptos::prelude::*;

use crate::api::{self, ChatMessage, Role};
use crate::components::{ErrorBanner, MessageBubble};

#[component]
pub fn ChatPage() -> impl IntoView {
    let (messages, set_messages) = signal(Vec::<ChatMessage>::new());
    let (input, set_input) = signal(String::new());
    let (loading, set_loading) = signal(false);
    let (error, set_error) = signal(None::<String>);
    let (session_id, set_session_id) = signal(String::new());

    let send = move |_| {
        let query = input.get();
        if query.trim().is_empty() || loading.get() {
            return;
        }

        set_error.set(None);
        set_messages.update(|msgs| {
            let id = msgs.len();
            msgs.push(ChatMessage::new(id, Role::User, query.clone()));
        });

        set_input.set(String::new());
        set_loading.set(true);

        let session = session_id.get();
        leptos::task::spawn_local(async move {
            match api::send_query(&query, Some(&session)).await {
                Ok(answer) => {
                    set_messages.update(|msgs| {
                        let id = msgs.len();
                        msgs.push(ChatMessage::new(id, Role::Assistant, answer));
                    });
                }
                // The user turn stays; nothing is added for the failure
                Err(e) => set_error.set(Some(e)),
            }
            set_loading.set(false);
        });
    };

    view! {
        <div class="chat">
            <aside class="sidebar">
                <h2>"Session"</h2>
                <div class="field">
                    <label>"Session ID"</label>
                    <input
                        type="text"
                        placeholder="default"
                        prop:value=move || session_id.get()
                        on:input=move |ev| set_session_id.set(event_target_value(&ev))
                    />
                </div>
                <p class="hint">"Reuse an ID to continue an earlier conversation."</p>
            </aside>

            <section class="chat-main">
                <div class="messages">
                    <For
                        each=move || messages.get()
                        key=|msg| msg.id
                        children=move |msg| view! { <MessageBubble message=msg /> }
                    />
                    <Show when=move || loading.get()>
                        <div class="message loading">"..."</div>
                    </Show>
                </div>

                {move || error.get().map(|message| view! { <ErrorBanner message=message /> })}

                <div class="input-area">
                    <textarea
                        placeholder="Ask about equipment, orders, lines or shifts..."
                        prop:value=move || input.get()
                        on:input=move |ev| set_input.set(event_target_value(&ev))
                        on:keydown=move |ev| {
                            if ev.key() == "Enter" && !ev.shift_key() {
                                ev.prevent_default();
                                send(());
                            }
                        }
                    />
                    <button on:click=move |_| send(()) disabled=move || loading.get()>
                        {move || if loading.get() { "..." } else { "Send" }}
                    </button>
                </div>
            </section>
        </div>
    }
}
