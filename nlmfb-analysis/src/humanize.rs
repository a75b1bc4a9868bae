//! Human-readable stimuli
//!
//! Model stimuli end with the critical sentence, e.g.
//! `... Sam comes back. Sam looks for the keys in the [MASK].`
//! People see the passage without that sentence, then the sentence stem as
//! a question.

use crate::{AnalysisError, AnalysisResult, Table};

/// Condition whose correct answer is the object's final location
pub const TRUE_BELIEF: &str = "True Belief";

#[derive(Debug, Clone, PartialEq)]
pub struct HumanReadable {
    /// Passage without the critical sentence
    pub passage_hr: String,
    /// Critical sentence stem, `[MASK]` removed
    pub critical_q: String,
    /// Expected completion
    pub critical_a: String,
}

/// Split a model passage into the parts shown to participants
pub fn humanize_passage(
    passage: &str,
    condition: &str,
    start: &str,
    end: &str,
) -> AnalysisResult<HumanReadable> {
    let segments: Vec<&str> = passage.split('.').collect();
    if segments.len() < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "passage has no sentence break: '{}'",
            passage
        )));
    }

    let body = &segments[..segments.len() - 2];
    let critical = segments[segments.len() - 2];

    let critical_a = if condition == TRUE_BELIEF { end } else { start };

    Ok(HumanReadable {
        passage_hr: format!("{}.", body.join(".")),
        critical_q: critical.replace("[MASK]", "").trim().to_string(),
        critical_a: critical_a.to_string(),
    })
}

/// Add (or refresh) `passage_hr`, `critical_q` and `critical_a` columns
pub fn humanize_table(table: &mut Table) -> AnalysisResult<()> {
    let passages = table.column("passage")?;
    let conditions = table.column("condition")?;
    let starts = table.column("start")?;
    let ends = table.column("end")?;

    let mut passage_hr = Vec::with_capacity(table.len());
    let mut critical_q = Vec::with_capacity(table.len());
    let mut critical_a = Vec::with_capacity(table.len());

    for (((passage, condition), start), end) in passages.into_iter().zip(conditions).zip(starts).zip(ends) {
        let hr = humanize_passage(passage, condition, start, end)?;
        passage_hr.push(hr.passage_hr);
        critical_q.push(hr.critical_q);
        critical_a.push(hr.critical_a);
    }

    table.set_column("passage_hr", passage_hr)?;
    table.set_column("critical_q", critical_q)?;
    table.set_column("critical_a", critical_a)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSAGE: &str =
        "Sam puts the keys in the box. Alex moves them to the basket. Sam looks for the keys in the [MASK].";

    #[test]
    fn test_false_belief_answer_is_start() {
        let hr = humanize_passage(PASSAGE, "False Belief", "box", "basket").unwrap();
        assert_eq!(
            hr.passage_hr,
            "Sam puts the keys in the box. Alex moves them to the basket."
        );
        assert_eq!(hr.critical_q, "Sam looks for the keys in the");
        assert_eq!(hr.critical_a, "box");
    }

    #[test]
    fn test_true_belief_answer_is_end() {
        let hr = humanize_passage(PASSAGE, TRUE_BELIEF, "box", "basket").unwrap();
        assert_eq!(hr.critical_a, "basket");
    }

    #[test]
    fn test_single_sentence_passage() {
        let hr = humanize_passage("Look in the [MASK].", "False Belief", "a", "b").unwrap();
        assert_eq!(hr.passage_hr, ".");
        assert_eq!(hr.critical_q, "Look in the");
    }

    #[test]
    fn test_passage_without_period_rejected() {
        assert!(humanize_passage("no break", "False Belief", "a", "b").is_err());
    }

    #[test]
    fn test_humanize_table_adds_columns() {
        let csv = format!(
            "item_id,passage,condition,start,end\n1_fb,\"{}\",False Belief,box,basket\n",
            PASSAGE
        );
        let mut table = Table::from_reader(csv.as_bytes()).unwrap();
        humanize_table(&mut table).unwrap();

        assert_eq!(
            &table.headers()[5..],
            &["passage_hr", "critical_q", "critical_a"]
        );
        assert_eq!(table.column("critical_a").unwrap(), vec!["box"]);

        // Running twice replaces rather than duplicating
        humanize_table(&mut table).unwrap();
        assert_eq!(table.headers().len(), 8);
    }
}
