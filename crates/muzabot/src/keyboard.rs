//! Inline keyboard and message text for paged search results.

use muzacore::SearchSession;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Longest track title shown on a button before truncation.
const MAX_TITLE_LENGTH: usize = 30;

/// Keyboard for the session's current page: one button per track, a
/// navigation row, and a cancel row.
pub fn results_keyboard(session: &SearchSession) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    let start = session.page_start();
    for (offset, track) in session.page_tracks().iter().enumerate() {
        let global_idx = start + offset;
        let label = format!(
            "{}. {} {} • {}",
            global_idx + 1,
            track.source.emoji(),
            truncate_title(&track.title, MAX_TITLE_LENGTH),
            track.duration
        );
        rows.push(vec![InlineKeyboardButton::callback(
            label,
            format!("dl:{}", global_idx),
        )]);
    }

    let total_pages = session.total_pages();
    let mut nav_row = Vec::new();
    if session.page > 0 {
        nav_row.push(InlineKeyboardButton::callback(
            "⬅️ Назад".to_string(),
            format!("page:{}", session.page - 1),
        ));
    }
    nav_row.push(InlineKeyboardButton::callback(
        format!("📄 {}/{}", session.page + 1, total_pages),
        "page:info".to_string(),
    ));
    if session.page + 1 < total_pages {
        nav_row.push(InlineKeyboardButton::callback(
            "Вперёд ➡️".to_string(),
            format!("page:{}", session.page + 1),
        ));
    }
    rows.push(nav_row);

    rows.push(vec![InlineKeyboardButton::callback(
        "❌ Отмена".to_string(),
        "cancel".to_string(),
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Header text shown above the keyboard.
pub fn page_text(session: &SearchSession) -> String {
    format!(
        "🎵 <b>Результаты поиска</b>\n\
         📊 Найдено: {} треков\n\
         📄 Страница {} из {}\n\n\
         ⏬ Выбери трек для скачивания:",
        session.tracks.len(),
        session.page + 1,
        session.total_pages()
    )
}

/// Char-safe truncation with an ellipsis; titles come from arbitrary sites
/// and are frequently Cyrillic, so byte slicing is off the table.
fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let mut truncated: String = title.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muzacore::core::config::search::TRACKS_PER_PAGE;
    use muzacore::{SourceKind, Track};
    use teloxide::types::InlineKeyboardButtonKind;

    fn session(total: usize, page: usize) -> SearchSession {
        let tracks = (0..total)
            .map(|n| Track {
                title: format!("Track {}", n),
                artist: "Artist".to_string(),
                duration: "3:00".to_string(),
                locator: format!("https://example.com/{}", n),
                source: SourceKind::YouTube,
            })
            .collect();
        let mut s = SearchSession::new("q", tracks);
        s.set_page(page);
        s
    }

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("expected callback button, got {:?}", other),
        }
    }

    #[test]
    fn test_first_page_has_no_back_button() {
        let kb = results_keyboard(&session(12, 0));
        // 5 track rows + nav + cancel
        assert_eq!(kb.inline_keyboard.len(), TRACKS_PER_PAGE + 2);
        let nav = &kb.inline_keyboard[TRACKS_PER_PAGE];
        assert_eq!(nav.len(), 2);
        assert_eq!(callback_data(&nav[0]), "page:info");
        assert_eq!(callback_data(&nav[1]), "page:1");
    }

    #[test]
    fn test_middle_page_has_both_nav_buttons() {
        let kb = results_keyboard(&session(12, 1));
        let nav = &kb.inline_keyboard[TRACKS_PER_PAGE];
        assert_eq!(nav.len(), 3);
        assert_eq!(callback_data(&nav[0]), "page:0");
        assert_eq!(callback_data(&nav[2]), "page:2");
        assert!(nav[1].text.contains("2/3"));
    }

    #[test]
    fn test_last_page_partial_and_no_forward() {
        let kb = results_keyboard(&session(12, 2));
        // 2 track rows on the last page + nav + cancel
        assert_eq!(kb.inline_keyboard.len(), 2 + 2);
        let nav = &kb.inline_keyboard[2];
        assert_eq!(nav.len(), 2);
        assert_eq!(callback_data(&nav[0]), "page:1");
    }

    #[test]
    fn test_track_buttons_carry_global_indices() {
        let kb = results_keyboard(&session(12, 1));
        assert_eq!(callback_data(&kb.inline_keyboard[0][0]), "dl:5");
        assert!(kb.inline_keyboard[0][0].text.starts_with("6. "));
    }

    #[test]
    fn test_truncate_title_multibyte_safe() {
        let long = "Очень длинное название песни которое не влезает";
        let truncated = truncate_title(long, 30);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 33);

        assert_eq!(truncate_title("Short", 30), "Short");
    }

    #[test]
    fn test_page_text_counts() {
        let text = page_text(&session(12, 1));
        assert!(text.contains("12 треков"));
        assert!(text.contains("Страница 2 из 3"));
    }
}
