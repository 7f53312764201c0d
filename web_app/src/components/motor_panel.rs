//! Main page: one card per motor, group controls, servo and emergency stop.
//!
//! Grabbing a slider holds an edit so incoming broadcasts don't yank the
//! thumb back. The dragged value waits for "Set" after the pointer is
//! released. "Revert", Escape or a cancelled pointer gesture drop it and
//! show the last committed or reported target again.

use leptos::prelude::*;
use motor_link::{Action, ControlId};

use crate::websocket::PanelManager;

fn button_class(active: bool) -> &'static str {
    if active {
        "px-2 py-1 text-[11px] rounded bg-[#3b82f6] text-white"
    } else {
        "px-2 py-1 text-[11px] rounded bg-[#1a1a1a] text-[#cccccc] hover:bg-[#222222]"
    }
}

#[component]
pub fn MotorPanel() -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let motor_count = manager.config.with_value(|c| c.motor_count);

    view! {
        <div class="flex flex-col gap-4">
            <div class="grid grid-cols-2 gap-4">
                {(0..motor_count).map(|index| view! { <MotorCard index=index/> }).collect_view()}
            </div>
            <AllMotorsCard/>
            <ServoCard/>
            <button
                class="w-full py-3 rounded bg-[#ff4444] text-white font-semibold hover:bg-[#ff5555]"
                on:click=move |_| manager.submit(Action::EmergencyStop)
            >
                "EMERGENCY STOP"
            </button>
        </div>
    }
}

#[component]
fn MotorCard(index: usize) -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let ui = manager.ui;
    let (min, max) = manager.config.with_value(|c| (c.target_min, c.target_max));

    let motor = move || ui.get().motor(index).copied().unwrap_or_default();
    let held = RwSignal::new(false);
    let revert = move || {
        held.set(false);
        manager.cancel_edit(ControlId::Motor(index));
    };

    view! {
        <div class="p-3 rounded-lg bg-[#111111] border border-[#ffffff10]">
            <div class="flex items-center justify-between mb-2">
                <h3 class="text-sm font-semibold text-white">{format!("Motor {}", index + 1)}</h3>
                <span class="text-[10px] text-[#888888]">{move || motor().activity().label()}</span>
            </div>
            <div class="text-[11px] text-[#cccccc] mb-2">
                "Position: " {move || motor().position} " mm / Target: " {move || motor().target} " mm"
            </div>
            <input
                type="range"
                class="w-full"
                min=min
                max=max
                prop:value=move || motor().target
                on:pointerdown=move |_| {
                    held.set(true);
                    manager.begin_edit(ControlId::Motor(index));
                }
                on:pointercancel=move |_| revert()
                on:input=move |ev| {
                    if let Ok(target) = event_target_value(&ev).parse::<i32>() {
                        manager.preview_target(index, target);
                    }
                }
                on:keydown=move |ev| {
                    if ev.key() == "Escape" {
                        revert();
                    }
                }
            />
            <div class="flex gap-2 mt-2">
                <button
                    class=button_class(false)
                    on:click=move |_| {
                        held.set(false);
                        manager.submit(Action::SetTarget { motor: index, target: motor().target });
                    }
                >
                    "Set"
                </button>
                <Show when=move || held.get()>
                    <button class=button_class(false) on:click=move |_| revert()>
                        "Revert"
                    </button>
                </Show>
                <button
                    class=move || button_class(motor().calibrating)
                    on:click=move |_| manager.submit(Action::Calibrate { motor: index })
                >
                    "Calibrate"
                </button>
                <button
                    class=move || button_class(motor().full_forward)
                    on:click=move |_| manager.submit(Action::FullForward { motor: index })
                >
                    "Forward"
                </button>
                <button
                    class=move || button_class(motor().full_backward)
                    on:click=move |_| manager.submit(Action::FullBackward { motor: index })
                >
                    "Backward"
                </button>
            </div>
        </div>
    }
}

#[component]
fn AllMotorsCard() -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let ui = manager.ui;
    let (min, max) = manager.config.with_value(|c| (c.target_min, c.target_max));
    // the group slider has no device-side value of its own
    let all_target = RwSignal::new(min);

    view! {
        <div class="p-3 rounded-lg bg-[#111111] border border-[#ffffff10]">
            <h3 class="text-sm font-semibold text-white mb-2">"All motors"</h3>
            <div class="text-[11px] text-[#cccccc] mb-2">"Target: " {move || all_target.get()} " mm"</div>
            <input
                type="range"
                class="w-full"
                min=min
                max=max
                prop:value=move || all_target.get()
                on:pointerdown=move |_| manager.begin_edit(ControlId::AllMotors)
                on:pointercancel=move |_| manager.cancel_edit(ControlId::AllMotors)
                on:input=move |ev| {
                    if let Ok(target) = event_target_value(&ev).parse::<i32>() {
                        all_target.set(target);
                    }
                }
            />
            <div class="flex gap-2 mt-2">
                <button
                    class=button_class(false)
                    on:click=move |_| manager.submit(Action::SetAllTargets { target: all_target.get_untracked() })
                >
                    "Set all"
                </button>
                <button class=button_class(false) on:click=move |_| manager.submit(Action::CalibrateAll)>
                    "Calibrate all"
                </button>
                <button
                    class=move || button_class(ui.get().all_motors_forward)
                    on:click=move |_| manager.submit(Action::AllFullForward)
                >
                    "All forward"
                </button>
                <button
                    class=move || button_class(ui.get().all_motors_backward)
                    on:click=move |_| manager.submit(Action::AllFullBackward)
                >
                    "All backward"
                </button>
            </div>
        </div>
    }
}

#[component]
fn ServoCard() -> impl IntoView {
    let manager = use_context::<PanelManager>().expect("PanelManager not found");
    let ui = manager.ui;

    view! {
        <div class="p-3 rounded-lg bg-[#111111] border border-[#ffffff10] flex items-center justify-between">
            <div>
                <h3 class="text-sm font-semibold text-white">"Servo"</h3>
                <span class="text-[11px] text-[#888888]">
                    {move || if ui.get().servo_on { "ON" } else { "OFF" }}
                </span>
            </div>
            <input
                type="checkbox"
                prop:checked=move || ui.get().servo_on
                on:change=move |ev| manager.submit(Action::SetServo { on: event_target_checked(&ev) })
            />
        </div>
    }
}
