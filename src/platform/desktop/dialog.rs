use crate::ui::state::screen::{Notice, NoticeLevel};

/// Whether save outcomes are reported through a native dialog instead of the
/// in-window banner.
pub const NATIVE_NOTICES: bool = cfg!(feature = "desktop");

/// Shows `notice` as a native dialog without blocking the event loop.
/// Resolves once the user closes it.
#[cfg(feature = "desktop")]
pub async fn show_notice(notice: &Notice) {
    use rfd::{AsyncMessageDialog, MessageButtons};

    let (level, title) = dialog_style(notice.level);
    AsyncMessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(notice.message.as_str())
        .set_buttons(MessageButtons::Ok)
        .show()
        .await;
}

#[cfg(not(feature = "desktop"))]
pub async fn show_notice(notice: &Notice) {
    if notice.level == NoticeLevel::Error {
        tracing::warn!(message = %notice.message, "save notice");
    }
}

#[cfg(feature = "desktop")]
fn dialog_style(level: NoticeLevel) -> (rfd::MessageLevel, &'static str) {
    match level {
        NoticeLevel::Info => (rfd::MessageLevel::Info, "Saved"),
        NoticeLevel::Error => (rfd::MessageLevel::Error, "Save failed"),
    }
}

#[cfg(all(test, feature = "desktop"))]
mod tests {
    use super::*;

    #[test]
    fn dialog_title_follows_level() {
        assert_eq!(dialog_style(NoticeLevel::Info).1, "Saved");
        assert_eq!(dialog_style(NoticeLevel::Error).1, "Save failed");
    }
}
