use leptos::prelude::*;
use motor_link::Action;

use crate::websocket::PanelManager;

const BUTTON: &str = "px-3 py-1 text-[11px] rounded bg-[#1a1a1a] text-[#cccccc] hover:bg-[#222222] disabled:opacity-40";
const DANGER: &str = "px-3 py-1 text-[11px] rounded bg-[#ff444420] text-[#ff4444] hover:bg-[#ff444440]";

/// Device info, OTA updates and maintenance actions.
#[component]
pub fn AdminPanel() -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let ui = manager.ui;

    let firmware_url = move || ui.get().available_update.and_then(|u| u.firmware_url);
    let littlefs_url = move || ui.get().available_update.and_then(|u| u.littlefs_url);
    let updating = move || ui.get().update.in_progress;

    view! {
        <div class="flex flex-col gap-4">
            <section class="p-3 rounded-lg bg-[#111111] border border-[#ffffff10] text-[11px] text-[#cccccc]">
                <h3 class="text-sm font-semibold text-white mb-2">"Device"</h3>
                <div>"IP: " {move || ui.get().ip}</div>
                <div>"Latest version: " {move || ui.get().latest_version.unwrap_or_else(|| "unknown".to_string())}</div>
            </section>

            <section class="p-3 rounded-lg bg-[#111111] border border-[#ffffff10] text-[11px] text-[#cccccc]">
                <h3 class="text-sm font-semibold text-white mb-2">"Updates"</h3>
                <Show when=move || updating() || !ui.get().update.status_text.is_empty()>
                    <div class="mb-2">
                        <div class="h-2 rounded bg-[#1a1a1a]">
                            <div
                                class="h-2 rounded bg-[#3b82f6]"
                                style=move || format!("width: {}%", ui.get().update.progress_percent)
                            ></div>
                        </div>
                        <div class="mt-1">{move || ui.get().update.status_text}</div>
                    </div>
                </Show>
                <div class="flex gap-2">
                    <button class=BUTTON on:click=move |_| manager.submit(Action::CheckUpdates)>
                        "Check for updates"
                    </button>
                    <button
                        class=BUTTON
                        disabled=move || updating() || firmware_url().is_none()
                        on:click=move |_| {
                            if let Some(url) = firmware_url() {
                                manager.submit(Action::UpdateFirmware { url });
                            }
                        }
                    >
                        "Update firmware"
                    </button>
                    <button
                        class=BUTTON
                        disabled=move || updating() || littlefs_url().is_none()
                        on:click=move |_| {
                            if let Some(url) = littlefs_url() {
                                manager.submit(Action::UpdateFilesystem { url });
                            }
                        }
                    >
                        "Update filesystem"
                    </button>
                </div>
            </section>

            <section class="p-3 rounded-lg bg-[#111111] border border-[#ffffff10]">
                <h3 class="text-sm font-semibold text-white mb-2">"Maintenance"</h3>
                <div class="flex gap-2">
                    <button class=DANGER on:click=move |_| manager.submit(Action::Restart)>"Restart"</button>
                    <button class=DANGER on:click=move |_| manager.submit(Action::ResetWifi)>"Reset WiFi"</button>
                    <button class=DANGER on:click=move |_| manager.submit(Action::FormatFilesystem)>"Format filesystem"</button>
                </div>
            </section>
        </div>
    }
}
