use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "StudentName")]
    pub student_name: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Grade")]
    pub grade: i64,
}

/// One page of the listing endpoint's response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudentPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<StudentRecord>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(default)]
    pub total: Option<u64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<StudentRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<StudentRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    StudentId,
    StudentName,
    Subject,
    Grade,
}

impl SortColumn {
    pub const ALL: [SortColumn; 4] = [
        SortColumn::StudentId,
        SortColumn::StudentName,
        SortColumn::Subject,
        SortColumn::Grade,
    ];

    pub fn as_param(&self) -> &'static str {
        match self {
            SortColumn::StudentId => "student_id",
            SortColumn::StudentName => "student_name",
            SortColumn::Subject => "subject",
            SortColumn::Grade => "grade",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::StudentId => "Student ID",
            SortColumn::StudentName => "Student Name",
            SortColumn::Subject => "Subject",
            SortColumn::Grade => "Grade",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_listing_response() {
        let page: StudentPage = serde_json::from_str(
            r#"{
                "data": [{"StudentID":"S1","StudentName":"Ann","Subject":"Math","Grade":91}],
                "page": 2, "limit": 10, "total": 11, "totalPages": 2
            }"#,
        )
        .unwrap();

        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total, Some(11));
        assert_eq!(
            page.data,
            vec![StudentRecord {
                student_id: "S1".to_string(),
                student_name: "Ann".to_string(),
                subject: "Math".to_string(),
                grade: 91,
            }]
        );
    }

    #[test]
    fn null_data_is_an_empty_page() {
        let page: StudentPage = serde_json::from_str(r#"{"data":null,"totalPages":0}"#).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, None);
    }

    #[test]
    fn sort_params_match_server_columns() {
        let params: Vec<_> = SortColumn::ALL.iter().map(|c| c.as_param()).collect();
        assert_eq!(params, vec!["student_id", "student_name", "subject", "grade"]);
        assert_eq!(SortOrder::Asc.toggled(), SortOrder::Desc);
        assert_eq!(SortOrder::Desc.as_param(), "desc");
    }
}
