use leptos::prelude::*;
use leptos::mount::mount_to_body;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;
use wasm_bindgen::prelude::*;

mod components;
mod websocket;

use components::{AdminPanel, ConfirmModal, MotorPanel, StatusBar, ToastContainer};
use websocket::PanelManager;

#[wasm_bindgen(start)]
pub fn main() {
    _ = console_log::init_with_level(log::Level::Debug);
    console_error_panic_hook::set_once();

    mount_to_body(|| view! { <App/> });
}

#[component]
pub fn App() -> impl IntoView {
    let manager = PanelManager::new();
    provide_context(manager);

    view! {
        <Router>
            <StatusBar/>
            <main class="p-4">
                <Routes fallback=|| view! { <MotorPanel/> }>
                    <Route path=path!("/") view=MotorPanel />
                    // Maintenance page served by the controller as /admin
                    <Route path=path!("/admin") view=AdminPanel />
                </Routes>
            </main>
            <ConfirmModal/>
            <ToastContainer/>
        </Router>
    }
}
