mod admin_panel;
mod confirm_modal;
mod motor_panel;
mod status_bar;
mod toast;

pub use admin_panel::AdminPanel;
pub use confirm_modal::ConfirmModal;
pub use motor_panel::MotorPanel;
pub use status_bar::StatusBar;
pub use toast::ToastContainer;
