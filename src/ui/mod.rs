pub mod selection;

use iced::{
    widget::{button, column, pick_list, progress_bar, row, text, text_input, Space},
    Element, Length,
};

use crate::domain::FormatChoice;

/// Main form state: the three inputs plus the busy/progress indicators.
pub struct FormView {
    pub url: String,
    pub folder: String,
    pub format: FormatChoice,
    pub status_message: String,
    pub is_downloading: bool,
    /// Percent of the current item; `None` hides the bar.
    pub progress: Option<u8>,
}

impl Default for FormView {
    fn default() -> Self {
        Self {
            url: String::new(),
            folder: String::new(),
            format: FormatChoice::default(),
            status_message: String::new(),
            is_downloading: false,
            progress: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FormMessage {
    UrlChanged(String),
    FolderChanged(String),
    FormatSelected(FormatChoice),
    BrowsePressed,
    DownloadPressed,
}

impl FormView {
    pub fn update(&mut self, message: FormMessage) {
        match message {
            FormMessage::UrlChanged(url) => self.url = url,
            FormMessage::FolderChanged(folder) => self.folder = folder,
            FormMessage::FormatSelected(format) => self.format = format,
            // Handled by the app
            FormMessage::BrowsePressed | FormMessage::DownloadPressed => {}
        }
    }

    pub fn view(&self) -> Element<'_, FormMessage> {
        // One download at a time: the button stays dead while a batch runs.
        let mut download = button("Download").padding([10, 20]);
        if !self.is_downloading {
            download = download.on_press(FormMessage::DownloadPressed);
        }

        let folder_row = row![
            text_input("Output folder...", &self.folder)
                .on_input(FormMessage::FolderChanged)
                .padding(10),
            button("Browse…")
                .on_press(FormMessage::BrowsePressed)
                .padding(10),
        ]
        .spacing(10);

        let mut content = column![
            text("YT2MPEG").size(32),
            Space::new().height(Length::Fixed(10.0)),
            text("YouTube URL:").size(16),
            text_input("YouTube URL (video or playlist)", &self.url)
                .on_input(FormMessage::UrlChanged)
                .padding(10),
            text("Output folder:").size(16),
            folder_row,
            text("Format:").size(16),
            pick_list(
                FormatChoice::ALL,
                Some(self.format),
                FormMessage::FormatSelected
            )
            .padding(10),
            Space::new().height(Length::Fixed(10.0)),
            download,
            text(&self.status_message).size(14),
        ]
        .padding(20)
        .spacing(10);

        if let Some(percent) = self.progress {
            content = content.push(progress_bar(0.0..=100.0, f32::from(percent)));
        }

        content.into()
    }
}
