use crate::feedback::Comment;

/// Position of a feed session. `page == 0` means nothing has been loaded yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationCursor {
    pub page: u32,
    pub has_next_page: bool,
    pub total_count: u64,
}

impl PaginationCursor {
    pub fn next_page(&self) -> Option<u32> {
        (self.has_next_page || self.page == 0).then_some(self.page + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub cursor: PaginationCursor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cursor_points_at_first_page() {
        assert_eq!(PaginationCursor::default().next_page(), Some(1));
    }

    #[test]
    fn exhausted_cursor_has_no_next_page() {
        let cursor = PaginationCursor {
            page: 3,
            has_next_page: false,
            total_count: 25,
        };
        assert_eq!(cursor.next_page(), None);
    }
}
