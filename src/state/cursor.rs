/// Position of the crawl within the paginated listing
///
/// Owned by the coordinator for a single run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCursor {
    /// 1-based listing page number
    pub page_number: u32,

    /// 1-based index of the current item on its page
    pub item_index: u32,

    /// Cleared on the first out-of-window item; never set again
    within_target_window: bool,
}

impl CrawlCursor {
    pub fn new() -> Self {
        Self {
            page_number: 1,
            item_index: 1,
            within_target_window: true,
        }
    }

    /// Moves to the next listing page
    pub fn next_page(&mut self) {
        self.page_number += 1;
        self.item_index = 1;
    }

    /// Points the cursor at the given 0-based item of the current page
    pub fn at_item(&mut self, index: usize) {
        self.item_index = index as u32 + 1;
    }

    /// `"{page}-{item}"`, the human-readable ordering id
    pub fn sequence_id(&self) -> String {
        format!("{}-{}", self.page_number, self.item_index)
    }

    pub fn within_target_window(&self) -> bool {
        self.within_target_window
    }

    /// Latches the cursor out of the target window
    pub fn leave_target_window(&mut self) {
        self.within_target_window = false;
    }
}

impl Default for CrawlCursor {
    fn default() -> Self {
        Self::new()
    }
}
