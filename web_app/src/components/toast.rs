//! Toast for the engine's single visible notification.

use leptos::prelude::*;
use motor_link::Severity;

use crate::websocket::PanelManager;

fn severity_classes(severity: Severity) -> (&'static str, &'static str) {
    match severity {
        Severity::Success => ("border-[#22c55e40]", "text-[#22c55e]"),
        Severity::Warning => ("border-[#f59e0b40]", "text-[#f59e0b]"),
        Severity::Error => ("border-[#ff444440]", "text-[#ff4444]"),
        Severity::Info => ("border-[#3b82f640]", "text-[#3b82f6]"),
    }
}

/// Dismissal is timed by the engine; the close button just expires it early.
#[component]
pub fn ToastContainer() -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let notification = manager.notification;

    view! {
        <div class="fixed bottom-4 left-4 z-50 flex flex-col gap-2 max-w-sm">
            {move || notification.get().map(|n| {
                let (border, accent) = severity_classes(n.severity);
                view! {
                    <div class=format!("flex items-start gap-2 p-3 rounded-lg border shadow-lg bg-[#0d0d0d] {}", border)>
                        <span class=format!("text-[10px] uppercase font-semibold {}", accent)>
                            {n.severity.as_str()}
                        </span>
                        <p class="flex-1 text-[11px] text-white">{n.message.clone()}</p>
                        <button
                            class="text-[#666666] hover:text-white transition-colors"
                            on:click=move |_| manager.dismiss_notification()
                        >
                            <svg class="w-3 h-3" fill="none" stroke="currentColor" viewBox="0 0 24 24">
                                <path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M6 18L18 6M6 6l12 12"/>
                            </svg>
                        </button>
                    </div>
                }
            })}
        </div>
    }
}
