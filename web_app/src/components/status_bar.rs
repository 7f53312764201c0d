use leptos::prelude::*;
use leptos_router::components::A;
use motor_link::ConnectionState;

use crate::websocket::PanelManager;

/// Connection indicator, device address and global status.
#[component]
pub fn StatusBar() -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let connection = manager.connection;
    let ui = manager.ui;

    let dot_class = move || match connection.get() {
        ConnectionState::Open => "w-2 h-2 rounded-full bg-[#22c55e]",
        ConnectionState::Connecting => "w-2 h-2 rounded-full bg-[#f59e0b] animate-pulse",
        ConnectionState::Idle | ConnectionState::Closed => "w-2 h-2 rounded-full bg-[#ff4444]",
    };

    view! {
        <header class="flex items-center gap-4 px-4 h-10 bg-[#0d0d0d] border-b border-[#ffffff10] text-[11px]">
            <div class="flex items-center gap-2">
                <span class=dot_class></span>
                <span class="text-white">{move || connection.get().label()}</span>
            </div>
            <Show when=move || connection.get() == ConnectionState::Closed>
                <button
                    class="px-2 py-0.5 rounded bg-[#1a1a1a] text-[#cccccc] hover:bg-[#222222]"
                    on:click=move |_| manager.reconnect()
                >
                    "Reconnect now"
                </button>
            </Show>
            <span class="text-[#888888]">
                "IP: " {move || {
                    let ip = ui.get().ip;
                    if ip.is_empty() { "-".to_string() } else { ip }
                }}
            </span>
            <span class=move || if ui.get().global_status.is_running() { "text-[#22c55e]" } else { "text-[#888888]" }>
                {move || ui.get().global_status.to_string()}
            </span>
            <nav class="ml-auto flex gap-3">
                <A href="/">"Motors"</A>
                <A href="/admin">"Admin"</A>
            </nav>
        </header>
    }
}
