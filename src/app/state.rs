use crate::students::{QueryState, StudentPage, StudentRecord};

pub const UPLOAD_ERROR: &str = "Failed to upload files. Please try again.";
pub const FETCH_ERROR: &str = "Failed to fetch students. Please try again later.";
pub const PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];

#[derive(Debug)]
pub struct AppState {
    pub show_progress: bool,
    pub alert: Option<String>,
    pub error_message: Option<String>,
    pub query: QueryState,
    pub last_requested: Option<QueryState>,
    pub students: Vec<StudentRecord>,
    pub total_pages: u32,
    pub total_records: Option<u64>,
}

impl AppState {
    pub fn new(page_size: u32) -> Self {
        Self {
            show_progress: false,
            alert: None,
            error_message: None,
            query: QueryState::new(page_size),
            last_requested: None,
            students: Vec::new(),
            total_pages: 1,
            total_records: None,
        }
    }

    /// True when the query changed since the last request went out.
    pub fn needs_fetch(&self) -> bool {
        self.last_requested.as_ref() != Some(&self.query)
    }

    pub fn apply_page(&mut self, page: StudentPage) {
        self.students = page.data;
        self.total_pages = page.total_pages;
        self.total_records = page.total;
    }
}
