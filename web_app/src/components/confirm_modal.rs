use leptos::prelude::*;

use crate::websocket::PanelManager;

/// Dialog for gated actions. Clicking the backdrop counts as cancel.
#[component]
pub fn ConfirmModal() -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let pending = manager.pending;

    view! {
        <Show when=move || pending.get().is_some()>
            <div
                class="fixed inset-0 bg-black/60 flex items-center justify-center z-50"
                on:click=move |_| manager.cancel()
            >
                <div
                    class="bg-[#111111] border border-[#ffffff10] rounded-lg p-4 w-96"
                    on:click=|ev| ev.stop_propagation()
                >
                    <h3 class="text-sm font-semibold text-white mb-2">
                        {move || pending.get().map(|p| p.title).unwrap_or_default()}
                    </h3>
                    <p class="text-[11px] text-[#cccccc] mb-4">
                        {move || pending.get().map(|p| p.message).unwrap_or_default()}
                    </p>
                    <div class="flex justify-end gap-2">
                        <button
                            class="px-3 py-1 text-[11px] rounded bg-[#1a1a1a] text-[#cccccc] hover:bg-[#222222]"
                            on:click=move |_| manager.cancel()
                        >
                            "Cancel"
                        </button>
                        <button
                            class="px-3 py-1 text-[11px] rounded bg-[#ff4444] text-white hover:bg-[#ff5555]"
                            on:click=move |_| manager.confirm()
                        >
                            "Confirm"
                        </button>
                    </div>
                </div>
            </div>
        </Show>
    }
}
