use serde::Serialize;

/// The chat input: pending text and whether a reply is being awaited.
///
/// `loading` is advisory. The bridge refuses a second send while it is set,
/// but the controller itself does not check it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Composer {
    draft: String,
    loading: bool,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}
