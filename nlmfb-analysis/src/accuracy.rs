//! Model accuracy from scored files

use crate::{is_compound_word, AnalysisError, AnalysisResult, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    pub rows: usize,
    /// Share of rows where the log-odds choice equals the expected answer
    pub lp_accuracy: f64,
    /// Share of rows where the generated token equals the expected answer
    pub tg_accuracy: f64,
}

/// Token the model generated, joining two tokens that spell a compound
/// word; returns the token and its log-probability
pub fn generated_token(pred_t1: &str, pred_t2: &str, pred_lp1: f64, pred_lp2: f64) -> (String, f64) {
    let joined = format!("{}{}", pred_t1, pred_t2);
    if is_compound_word(&joined) {
        (joined, pred_lp1 + pred_lp2)
    } else {
        (pred_t1.to_string(), pred_lp1)
    }
}

pub fn model_accuracy(table: &Table) -> AnalysisResult<AccuracyReport> {
    if table.is_empty() {
        return Err(AnalysisError::InvalidInput("scored file has no rows".to_string()));
    }

    let expected = table.column("critical_a")?;
    let lp_pred = table.column("lp_pred")?;
    let pred_t1 = table.column("pred_t1")?;
    let pred_t2 = table.column("pred_t2")?;
    let pred_lp1 = parse_floats(table, "pred_lp1")?;
    let pred_lp2 = parse_floats(table, "pred_lp2")?;

    let mut lp_hits = 0usize;
    let mut tg_hits = 0usize;
    for i in 0..table.len() {
        if lp_pred[i] == expected[i] {
            lp_hits += 1;
        }
        let (token, _) = generated_token(pred_t1[i], pred_t2[i], pred_lp1[i], pred_lp2[i]);
        if token == expected[i] {
            tg_hits += 1;
        }
    }

    let rows = table.len();
    Ok(AccuracyReport {
        rows,
        lp_accuracy: lp_hits as f64 / rows as f64,
        tg_accuracy: tg_hits as f64 / rows as f64,
    })
}

/// Round to three decimal places for reporting
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Rounded score as printed in reports; whole numbers keep `.0`
pub fn format_accuracy(value: f64) -> String {
    format!("{:?}", round3(value))
}

fn parse_floats(table: &Table, column: &str) -> AnalysisResult<Vec<f64>> {
    table
        .column(column)?
        .into_iter()
        .map(|v| {
            v.trim().parse::<f64>().map_err(|_| {
                AnalysisError::InvalidInput(format!("{} value '{}' is not a number", column, v))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORED: &str = "\
critical_a,lp_pred,pred_t1,pred_t2,pred_lp1,pred_lp2
box,box,box,.,-0.5,-0.1
basket,box,basket,.,-0.7,-0.2
cupboard,cupboard,cup,board,-1.0,-0.3
";

    #[test]
    fn test_generated_token_joins_compounds() {
        assert_eq!(generated_token("tool", "box", -1.0, -0.5), ("toolbox".to_string(), -1.5));
        assert_eq!(generated_token("box", ".", -1.0, -0.5), ("box".to_string(), -1.0));
    }

    #[test]
    fn test_model_accuracy() {
        let table = Table::from_reader(SCORED.as_bytes()).unwrap();
        let report = model_accuracy(&table).unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(round3(report.lp_accuracy), 0.667);
        assert_eq!(report.tg_accuracy, 1.0);
    }

    #[test]
    fn test_empty_file_rejected() {
        let table = Table::from_reader("critical_a,lp_pred\n".as_bytes()).unwrap();
        assert!(model_accuracy(&table).is_err());
    }

    #[test]
    fn test_format_accuracy() {
        assert_eq!(format_accuracy(1.0), "1.0");
        assert_eq!(format_accuracy(0.0), "0.0");
        assert_eq!(format_accuracy(2.0 / 3.0), "0.667");
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.66666), 0.667);
        assert_eq!(round3(0.5), 0.5);
    }
}
