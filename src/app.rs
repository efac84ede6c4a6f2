use std::path::PathBuf;
use std::sync::Arc;

use iced::Task;
use rfd::MessageLevel;

use crate::application::{spawn_batch, WorkerEvent};
use crate::domain::{BatchJob, DownloadItem, PlaylistInfo};
use crate::engine::{EngineError, MediaEngine, YtDlpEngine};
use crate::prefs::{Preferences, PrefsStore};
use crate::ui::selection::{SelectionMessage, SelectionView};
use crate::ui::{FormMessage, FormView};

pub struct DownloadApp {
    view: FormView,
    /// `Some` while the playlist selection dialog replaces the form.
    selection: Option<SelectionView>,
    engine: Arc<dyn MediaEngine>,
    store: PrefsStore,
    prefs: Preferences,
}

impl DownloadApp {
    pub fn new(store: PrefsStore) -> Self {
        let prefs = store.load();
        let mut view = FormView::default();
        if let Some(folder) = &prefs.last_output_folder {
            view.folder = folder.display().to_string();
        }

        Self {
            view,
            selection: None,
            engine: Arc::new(YtDlpEngine::new()),
            store,
            prefs,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Form(FormMessage),
    FolderPicked(Option<PathBuf>),
    /// `Err` carries the engine's extraction message verbatim.
    Resolved(Result<PlaylistInfo, String>),
    Selection(SelectionMessage),
    Worker(WorkerEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::Form(form_msg) => {
            app.view.update(form_msg.clone());

            match form_msg {
                FormMessage::BrowsePressed => {
                    return Task::perform(
                        async {
                            rfd::AsyncFileDialog::new()
                                .set_title("Select Output Folder")
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderPicked,
                    );
                }
                FormMessage::DownloadPressed => return start_resolution(app),
                _ => {}
            }
        }
        Message::FolderPicked(folder) => {
            if let Some(folder) = folder {
                app.view.folder = folder.display().to_string();
                // Save immediately
                app.prefs.last_output_folder = Some(folder);
                app.store.save(&app.prefs);
            }
        }
        Message::Resolved(result) => match result {
            Ok(playlist) => {
                if playlist.is_collection {
                    app.view.status_message.clear();
                    app.selection = Some(SelectionView::new(playlist));
                } else {
                    return start_batch(app, playlist.items);
                }
            }
            Err(message) => {
                app.view.is_downloading = false;
                app.view.status_message.clear();
                return alert(
                    MessageLevel::Error,
                    "Error",
                    format!("Failed to process URL:\n{}", message),
                );
            }
        },
        Message::Selection(sel_msg) => match sel_msg {
            SelectionMessage::Confirmed => {
                if let Some(selection) = app.selection.take() {
                    let items = selection.selected();
                    if items.is_empty() {
                        app.view.is_downloading = false;
                        app.view.status_message.clear();
                        return alert(
                            MessageLevel::Warning,
                            "Error",
                            "No videos selected".to_string(),
                        );
                    }
                    return start_batch(app, items);
                }
            }
            SelectionMessage::Cancelled => {
                app.selection = None;
                app.view.is_downloading = false;
                app.view.status_message.clear();
            }
            other => {
                if let Some(selection) = &mut app.selection {
                    selection.update(other);
                }
            }
        },
        Message::Worker(event) => match event {
            WorkerEvent::ItemStarted { index, total } => {
                app.view.progress = Some(0);
                app.view.status_message = if total > 1 {
                    format!("Downloading video {} of {}", index, total)
                } else {
                    "Downloading...".to_string()
                };
            }
            WorkerEvent::ItemProgress { percent } => {
                app.view.progress = Some(percent);
            }
            WorkerEvent::Finished(result) => {
                app.view.is_downloading = false;
                app.view.progress = None;
                app.view.status_message.clear();

                let (level, title) = if result.is_success() {
                    (MessageLevel::Info, "Success")
                } else {
                    (MessageLevel::Error, "Error")
                };
                return alert(level, title, result.summary());
            }
        },
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    match &app.selection {
        Some(selection) => selection.view().map(Message::Selection),
        None => app.view.view().map(Message::Form),
    }
}

/// Kick off metadata resolution for the entered URL. The engine call is a
/// network round trip, so it runs on the blocking pool.
fn start_resolution(app: &mut DownloadApp) -> Task<Message> {
    if app.view.is_downloading {
        return Task::none();
    }

    let url = app.view.url.trim().to_string();
    let folder = app.view.folder.trim().to_string();
    if url.is_empty() || folder.is_empty() {
        return alert(
            MessageLevel::Warning,
            "Error",
            "Please enter URL and output folder".to_string(),
        );
    }

    app.view.is_downloading = true;
    app.view.status_message = "Checking URL...".to_string();

    let engine = Arc::clone(&app.engine);
    Task::perform(
        async move {
            tokio::task::spawn_blocking(move || engine.resolve(&url))
                .await
                .unwrap_or_else(|e| {
                    Err(EngineError::Extraction(format!("resolver crashed: {}", e)))
                })
                .map_err(|e| e.to_string())
        },
        Message::Resolved,
    )
}

/// Hand the confirmed items to a fresh worker thread and turn its channel
/// into a stream of UI messages.
fn start_batch(app: &mut DownloadApp, items: Vec<DownloadItem>) -> Task<Message> {
    let destination = PathBuf::from(app.view.folder.trim());
    let Some(job) = BatchJob::new(items, app.view.format, destination) else {
        app.view.is_downloading = false;
        return alert(
            MessageLevel::Warning,
            "Error",
            "No videos selected".to_string(),
        );
    };

    app.view.status_message = "Starting download...".to_string();
    app.view.progress = Some(0);

    let rx = spawn_batch(Arc::clone(&app.engine), job);
    Task::stream(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Message::Worker(event), rx))
    }))
}

/// Blocking message box, the desktop counterpart of a status line.
fn alert(level: MessageLevel, title: &str, description: String) -> Task<Message> {
    let dialog = rfd::AsyncMessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description.as_str());

    Task::future(async move {
        dialog.show().await;
    })
    .discard()
}
