use super::types::{SortColumn, SortOrder};

/// Parameters of the student listing. Any change means the current page of
/// records is stale and must be fetched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortColumn,
    pub sort_order: SortOrder,
    pub student_name: String,
    pub subject: String,
    pub grade_min: String,
    pub grade_max: String,
}

impl QueryState {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            sort_by: SortColumn::StudentName,
            sort_order: SortOrder::Asc,
            student_name: String::new(),
            subject: String::new(),
            grade_min: String::new(),
            grade_max: String::new(),
        }
    }

    /// Header click: flips the order on the active column, otherwise makes
    /// `column` active in ascending order.
    pub fn sort_by_column(&mut self, column: SortColumn) {
        if self.sort_by == column {
            self.sort_order = self.sort_order.toggled();
        } else {
            self.sort_by = column;
            self.sort_order = SortOrder::Asc;
        }
    }

    pub fn can_go_previous(&self) -> bool {
        self.page > 1
    }

    pub fn can_go_next(&self, total_pages: u32) -> bool {
        self.page < total_pages
    }

    pub fn previous_page(&mut self) {
        if self.can_go_previous() {
            self.page -= 1;
        }
    }

    pub fn next_page(&mut self, total_pages: u32) {
        if self.can_go_next(total_pages) {
            self.page += 1;
        }
    }

    pub fn set_limit(&mut self, limit: u32) {
        let limit = limit.max(1);
        if self.limit != limit {
            self.limit = limit;
            self.page = 1;
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sort_by", self.sort_by.as_param().to_string()),
            ("sort_order", self.sort_order.as_param().to_string()),
            ("student_name", self.student_name.trim().to_string()),
            ("subject", self.subject.trim().to_string()),
            ("grade_min", self.grade_min.trim().to_string()),
            ("grade_max", self.grade_max.trim().to_string()),
        ]
    }
}

/// Keeps what a number field would accept: digits, one leading minus sign
/// and a single decimal point.
pub fn numeric_filter(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut seen_point = false;
    for c in input.chars() {
        match c {
            '0'..='9' => out.push(c),
            '-' if out.is_empty() => out.push(c),
            '.' if !seen_point => {
                seen_point = true;
                out.push(c);
            }
            _ => {}
        }
    }
    out
}
