use iced::{
    widget::{button, checkbox, column, row, scrollable, text, Space},
    Element, Length,
};

use crate::domain::{DownloadItem, PlaylistInfo};

/// Playlist selection: every item starts selected and keeps its original
/// order through any amount of toggling.
pub struct SelectionView {
    title: String,
    items: Vec<DownloadItem>,
    checked: Vec<bool>,
}

#[derive(Debug, Clone)]
pub enum SelectionMessage {
    Toggled(usize, bool),
    SelectAll,
    DeselectAll,
    Confirmed,
    Cancelled,
}

impl SelectionView {
    pub fn new(playlist: PlaylistInfo) -> Self {
        let checked = vec![true; playlist.items.len()];
        Self {
            title: playlist.title,
            items: playlist.items,
            checked,
        }
    }

    pub fn update(&mut self, message: SelectionMessage) {
        match message {
            SelectionMessage::Toggled(index, value) => {
                if let Some(slot) = self.checked.get_mut(index) {
                    *slot = value;
                }
            }
            SelectionMessage::SelectAll => self.checked.fill(true),
            SelectionMessage::DeselectAll => self.checked.fill(false),
            // Handled by the app
            SelectionMessage::Confirmed | SelectionMessage::Cancelled => {}
        }
    }

    /// The confirmed subset, preserving playlist order.
    pub fn selected(&self) -> Vec<DownloadItem> {
        self.items
            .iter()
            .zip(&self.checked)
            .filter(|(_, checked)| **checked)
            .map(|(item, _)| item.clone())
            .collect()
    }

    pub fn view(&self) -> Element<'_, SelectionMessage> {
        let list = self
            .items
            .iter()
            .enumerate()
            .fold(column![].spacing(4), |col, (index, item)| {
                col.push(
                    checkbox(self.checked[index])
                        .label(item.title.clone())
                        .on_toggle(move |value| SelectionMessage::Toggled(index, value)),
                )
            });

        column![
            text(format!("Playlist: {}", self.title)).size(20),
            text(format!(
                "{} videos found. Select videos to download:",
                self.items.len()
            ))
            .size(14),
            scrollable(list).height(Length::Fill),
            row![
                button("Select All")
                    .on_press(SelectionMessage::SelectAll)
                    .padding(10),
                button("Deselect All")
                    .on_press(SelectionMessage::DeselectAll)
                    .padding(10),
            ]
            .spacing(10),
            Space::new().height(Length::Fixed(10.0)),
            row![
                button("OK")
                    .on_press(SelectionMessage::Confirmed)
                    .padding([10, 20]),
                button("Cancel")
                    .on_press(SelectionMessage::Cancelled)
                    .padding([10, 20]),
            ]
            .spacing(10),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(n: usize) -> PlaylistInfo {
        PlaylistInfo {
            is_collection: true,
            title: "Mix".to_string(),
            items: (1..=n)
                .map(|i| DownloadItem {
                    id: format!("id{}", i),
                    title: format!("Video {}", i),
                    url: format!("https://www.youtube.com/watch?v=id{}", i),
                })
                .collect(),
        }
    }

    #[test]
    fn everything_starts_selected() {
        let view = SelectionView::new(playlist(3));
        assert_eq!(view.selected().len(), 3);
    }

    #[test]
    fn deselect_all_empties_the_selection() {
        let mut view = SelectionView::new(playlist(3));
        view.update(SelectionMessage::DeselectAll);
        assert!(view.selected().is_empty());
        view.update(SelectionMessage::SelectAll);
        assert_eq!(view.selected().len(), 3);
    }

    #[test]
    fn toggling_keeps_playlist_order() {
        let mut view = SelectionView::new(playlist(4));
        view.update(SelectionMessage::Toggled(1, false));
        view.update(SelectionMessage::Toggled(1, true));
        view.update(SelectionMessage::Toggled(2, false));

        let titles: Vec<String> = view.selected().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["Video 1", "Video 2", "Video 4"]);
    }

    #[test]
    fn out_of_range_toggles_are_ignored() {
        let mut view = SelectionView::new(playlist(2));
        view.update(SelectionMessage::Toggled(9, false));
        assert_eq!(view.selected().len(), 2);
    }
}
