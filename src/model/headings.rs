use crate::error::PipelineError;
use crate::model::{RestockRow, ROW_WIDTH};
use crate::Result;
use serde::{Deserialize, Serialize};

/// The sandwich names from the header row of a worksheet, in column order.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Headings(Vec<String>);

impl Headings {
    /// Fails with `PipelineError::Shape` unless there is one heading per sandwich type.
    pub(crate) fn new(worksheet: &str, headings: Vec<String>) -> Result<Self> {
        if headings.len() != ROW_WIDTH {
            return Err(PipelineError::Shape {
                worksheet: worksheet.to_string(),
                row: 1,
                expected: ROW_WIDTH,
                found: headings.len(),
            }
            .into());
        }
        Ok(Self(headings.into_iter().map(|h| h.trim().to_string()).collect()))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Pairs each heading with the matching restock figure, in heading order.
    pub fn label(&self, restock: &RestockRow) -> Vec<Suggestion> {
        self.0
            .iter()
            .zip(restock.values())
            .map(|(item, &quantity)| Suggestion {
                item: item.clone(),
                quantity,
            })
            .collect()
    }
}

/// How many of one sandwich type to make for the next market.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub item: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_label_keeps_heading_order() {
        let headings = Headings::new(
            "stock",
            names(&["cheese", "ham", "turkey", "roast beef", "tuna", "chicken"]),
        )
        .unwrap();
        let labelled = headings.label(&RestockRow::new([12, 3, 4, 5, 6, 7]));
        assert_eq!(labelled.len(), 6);
        assert_eq!(labelled[0].item, "cheese");
        assert_eq!(labelled[0].quantity, 12);
        assert_eq!(labelled[3].item, "roast beef");
        assert_eq!(labelled[5].quantity, 7);
    }

    #[test]
    fn test_wrong_count() {
        let e = Headings::new("stock", names(&["cheese", "ham"])).unwrap_err();
        assert!(matches!(
            e.downcast_ref::<PipelineError>(),
            Some(PipelineError::Shape { found: 2, row: 1, .. })
        ));
    }
}
