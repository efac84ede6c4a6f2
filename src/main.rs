mod app;
mod application;
mod domain;
mod engine;
mod prefs;
mod ui;

use prefs::PrefsStore;

fn main() -> iced::Result {
    env_logger::init();

    let store = PrefsStore::default_location();

    iced::application(
        move || app::DownloadApp::new(store.clone()),
        app::update,
        app::view,
    )
    .title("YT2MPEG")
    .window_size(iced::Size::new(480.0, 420.0))
    .run()
}
