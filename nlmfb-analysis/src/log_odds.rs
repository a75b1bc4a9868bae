//! Log-odds scoring of two candidate completions
//!
//! For each passage, the `[MASK].` slot is filled with each candidate and
//! the filled passage is scored by echo. The candidate's log-probability is
//! that of its final token (or final two, for compound words). A greedy
//! two-token continuation is also recorded so accuracy can be measured by
//! generation as well as by comparison.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::completion_client::{CompletionClient, CompletionRequest, Logprobs};
use crate::{is_compound_word, AnalysisError, AnalysisResult, Table};

const MASK: &str = "[MASK].";

/// Scores for one passage
#[derive(Debug, Clone, PartialEq)]
pub struct PassageScore {
    pub token_c1: String,
    pub token_c2: String,
    pub c1_logprob: f64,
    pub c2_logprob: f64,
    /// `c1_logprob - c2_logprob`
    pub log_odds: f64,
    /// Token of the preferred candidate
    pub lp_pred: String,
    pub pred_t1: String,
    pub pred_t2: String,
    pub pred_lp1: f64,
    pub pred_lp2: f64,
}

/// Columns appended to the input table, in order
pub const RESULT_COLUMNS: [&str; 10] = [
    "token_c1",
    "token_c2",
    "c1_logprob",
    "c2_logprob",
    "log_odds",
    "lp_pred",
    "pred_t1",
    "pred_t2",
    "pred_lp1",
    "pred_lp2",
];

impl PassageScore {
    fn to_row(&self) -> [String; 10] {
        [
            self.token_c1.clone(),
            self.token_c2.clone(),
            self.c1_logprob.to_string(),
            self.c2_logprob.to_string(),
            self.log_odds.to_string(),
            self.lp_pred.clone(),
            self.pred_t1.clone(),
            self.pred_t2.clone(),
            self.pred_lp1.to_string(),
            self.pred_lp2.to_string(),
        ]
    }
}

/// Strip line breaks and close up the space after the mask
pub fn normalize_passage(passage: &str) -> String {
    passage.replace('\n', "").replace("[MASK]. ", MASK)
}

/// Log-probability and token text of the word that ends an echoed prompt
pub fn candidate_logprob(logprobs: &Logprobs, word: &str) -> AnalysisResult<(String, f64)> {
    let take = if is_compound_word(word) { 2 } else { 1 };
    let n = logprobs.tokens.len();
    if n < take || logprobs.token_logprobs.len() != n {
        return Err(AnalysisError::UnexpectedResponse(format!(
            "echo for '{}' returned {} tokens",
            word, n
        )));
    }

    let token: String = logprobs.tokens[n - take..].concat().replace(' ', "");
    let mut total = 0.0;
    for lp in &logprobs.token_logprobs[n - take..] {
        total += lp.ok_or_else(|| {
            AnalysisError::UnexpectedResponse(format!("no log-probability for '{}'", word))
        })?;
    }

    Ok((token, total))
}

/// Score one passage against two candidates
pub async fn score_passage(
    client: &CompletionClient,
    model: &str,
    passage: &str,
    c1: &str,
    c2: &str,
) -> AnalysisResult<PassageScore> {
    let c1_echo = client
        .complete(&CompletionRequest::echo_scoring(model, &passage.replace(MASK, c1)))
        .await?;
    let c2_echo = client
        .complete(&CompletionRequest::echo_scoring(model, &passage.replace(MASK, c2)))
        .await?;

    let (token_c1, c1_logprob) = candidate_logprob(&c1_echo, c1)?;
    let (token_c2, c2_logprob) = candidate_logprob(&c2_echo, c2)?;
    let log_odds = c1_logprob - c2_logprob;
    let lp_pred = if log_odds > 0.0 { token_c1.clone() } else { token_c2.clone() };

    let continuation = client
        .complete(&CompletionRequest::greedy(model, &passage.replace(" [MASK].", ""), 2))
        .await?;
    let (pred_t1, pred_lp1, pred_t2, pred_lp2) = match (
        continuation.tokens.as_slice(),
        continuation.token_logprobs.as_slice(),
    ) {
        ([t1, t2, ..], [Some(lp1), Some(lp2), ..]) => {
            (t1.trim().to_string(), *lp1, t2.trim().to_string(), *lp2)
        }
        _ => {
            return Err(AnalysisError::UnexpectedResponse(
                "continuation returned fewer than two scored tokens".to_string(),
            ))
        }
    };

    Ok(PassageScore {
        token_c1,
        token_c2,
        c1_logprob,
        c2_logprob,
        log_odds,
        lp_pred,
        pred_t1,
        pred_t2,
        pred_lp1,
        pred_lp2,
    })
}

/// Score every row of `passages`, returning the table with result columns
///
/// The `passage` column is normalized in the output, matching what was sent.
pub async fn score_table(
    client: &CompletionClient,
    model: &str,
    passages: &Table,
    c1_column: &str,
    c2_column: &str,
) -> AnalysisResult<Table> {
    let passage_index = passages.column_index("passage")?;
    let c1_index = passages.column_index(c1_column)?;
    let c2_index = passages.column_index(c2_column)?;

    info!("Using model: {}", model);
    info!("#passages: {}", passages.len());

    let mut headers = passages.headers().to_vec();
    headers.extend(RESULT_COLUMNS.iter().map(|c| c.to_string()));
    let mut output = Table::new(headers);

    let progress = ProgressBar::new(passages.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for row in passages.rows() {
        let passage = normalize_passage(&row[passage_index]);
        let score = score_passage(client, model, &passage, &row[c1_index], &row[c2_index]).await?;

        let mut out_row = row.clone();
        out_row[passage_index] = passage;
        out_row.extend(score.to_row());
        output.push_row(out_row)?;

        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(tokens: &[&str], lps: &[Option<f64>]) -> Logprobs {
        Logprobs {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            token_logprobs: lps.to_vec(),
        }
    }

    #[test]
    fn test_normalize_passage() {
        assert_eq!(
            normalize_passage("One.\nTwo in the [MASK]. "),
            "One.Two in the [MASK]."
        );
    }

    #[test]
    fn test_single_token_candidate() {
        let lp = echo(&["The", " keys", " box"], &[None, Some(-3.0), Some(-1.25)]);
        assert_eq!(candidate_logprob(&lp, "box").unwrap(), ("box".to_string(), -1.25));
    }

    #[test]
    fn test_compound_candidate_sums_two_tokens() {
        let lp = echo(&["The", " cup", "board"], &[None, Some(-2.0), Some(-0.5)]);
        assert_eq!(candidate_logprob(&lp, "cupboard").unwrap(), ("cupboard".to_string(), -2.5));
    }

    #[test]
    fn test_missing_logprob_is_error() {
        let lp = echo(&["box"], &[None]);
        assert!(matches!(
            candidate_logprob(&lp, "box"),
            Err(AnalysisError::UnexpectedResponse(_))
        ));
        assert!(candidate_logprob(&Logprobs::default(), "box").is_err());
    }
}
