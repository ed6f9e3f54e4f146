pub mod hud_interface;
pub mod render_interface;
