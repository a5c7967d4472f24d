use log::{debug, info};

use crate::config::*;

/// Only the first round is used for the scores, even when a dataset has more.
pub const SCORE_ROUND: Round = 1;

/// Percentages of the registered voters per commune, one column per choice,
/// followed by the composite columns of the groupings (if any).
///
/// A value is missing when the commune has no registered voters.
pub type ScoreTable = Table<String, Option<f64>>;

impl ScoreTable {
    pub fn score(&self, key: &CommuneKey, label: &str) -> Option<f64> {
        self.get(key, &label.to_string()).flatten()
    }
}

/// Computes the score of every choice of the first round, as a percentage of
/// the registered voters of the first round.
///
/// If `groupings` is provided, three columns are appended: the sum of the scores
/// of the first group, of the second group, and the sum of both.
/// Scores are not clamped: inconsistent inputs may give values above 100.
pub fn compute_scores(
    totals: &CommuneTotals,
    groupings: Option<&Groupings>,
) -> Result<ScoreTable, ScoreError> {
    // Indices of the first round choices in the choice table, and their labels.
    let (choice_indices, labels): (Vec<usize>, Vec<String>) = totals
        .choices
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, (round, _))| *round == SCORE_ROUND)
        .map(|(idx, (_, label))| (idx, label.clone()))
        .unzip();
    debug!("compute_scores: choices {:?}", labels);

    let group_indices: Option<(Vec<usize>, Vec<usize>)> = match groupings {
        Some(g) => Some((
            group_members(&g.first, &labels)?,
            group_members(&g.second, &labels)?,
        )),
        None => None,
    };

    let mut columns = labels.clone();
    if let Some(g) = groupings {
        columns.push(g.first.name.clone());
        columns.push(g.second.name.clone());
        columns.push(g.union_name.clone());
    }
    let num_columns = columns.len();
    let mut table = ScoreTable::new(columns);

    for (commune, stats_row) in totals.stats.rows() {
        let registered = totals
            .stats
            .column_index(&(SCORE_ROUND, Statistic::Registered))
            .map(|idx| stats_row[idx])
            .unwrap_or(0);
        if registered == 0 {
            debug!("compute_scores: commune {} has no registered voters", commune);
            table.insert_row(commune.clone(), vec![None; num_columns]);
            continue;
        }
        let choice_row: &[u64] = totals.choices.row(commune).unwrap_or(&[]);
        let mut values: Vec<Option<f64>> = choice_indices
            .iter()
            .map(|idx| {
                let votes = choice_row.get(*idx).cloned().unwrap_or(0);
                Some(100.0 * votes as f64 / registered as f64)
            })
            .collect();
        if let Some((first, second)) = &group_indices {
            let first_sum: f64 = first.iter().filter_map(|idx| values[*idx]).sum();
            let second_sum: f64 = second.iter().filter_map(|idx| values[*idx]).sum();
            values.push(Some(first_sum));
            values.push(Some(second_sum));
            values.push(Some(first_sum + second_sum));
        }
        table.insert_row(commune.clone(), values);
    }
    info!(
        "compute_scores: {:?} communes, {:?} columns",
        table.len(),
        num_columns
    );
    Ok(table)
}

fn group_members(group: &NamedGroup, labels: &[String]) -> Result<Vec<usize>, ScoreError> {
    group
        .choices
        .iter()
        .map(|choice| {
            labels
                .iter()
                .position(|l| l == choice)
                .ok_or_else(|| ScoreError::UnknownChoice {
                    group: group.name.clone(),
                    label: choice.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn close(x: Option<f64>, y: f64) -> bool {
        matches!(x, Some(v) if (v - y).abs() < 1e-9)
    }

    fn groupings() -> Groupings {
        Groupings {
            first: NamedGroup::new("DROITE", &["C", "D"]),
            second: NamedGroup::new("GAUCHE", &["A"]),
            union_name: "TOTAL".to_string(),
        }
    }

    fn totals() -> CommuneTotals {
        let mut b = Builder::new();
        let k1 = CommuneKey::new("01", "001");
        let k2 = CommuneKey::new("01", "002");
        b.add_station(
            1,
            &k1,
            "1",
            StationCounts::new(1000, 700, 650),
            &[("A", 300), ("B", 200), ("C", 100), ("D", 50)],
        );
        b.add_station(
            1,
            &k2,
            "1",
            StationCounts::new(200, 100, 100),
            &[("A", 40), ("B", 40), ("C", 20)],
        );
        b.add_station(2, &k1, "1", StationCounts::new(1000, 600, 600), &[("A", 600)]);
        b.build().unwrap()
    }

    #[test]
    fn percentage_of_registered() {
        let scores = compute_scores(&totals(), None).unwrap();
        let k1 = CommuneKey::new("01", "001");
        assert_eq!(scores.columns(), &["A", "B", "C", "D"]);
        assert!(close(scores.score(&k1, "A"), 30.0));
        assert!(close(scores.score(&k1, "D"), 5.0));
        let k2 = CommuneKey::new("01", "002");
        assert!(close(scores.score(&k2, "A"), 20.0));
        // Absent choices count as zero votes.
        assert!(close(scores.score(&k2, "D"), 0.0));
    }

    #[test]
    fn composite_groups() {
        let scores = compute_scores(&totals(), Some(&groupings())).unwrap();
        let k1 = CommuneKey::new("01", "001");
        assert_eq!(
            scores.columns(),
            &["A", "B", "C", "D", "DROITE", "GAUCHE", "TOTAL"]
        );
        let c = scores.score(&k1, "C").unwrap();
        let d = scores.score(&k1, "D").unwrap();
        assert!(close(scores.score(&k1, "DROITE"), c + d));
        assert!(close(scores.score(&k1, "GAUCHE"), 30.0));
        assert!(close(scores.score(&k1, "TOTAL"), 45.0));
    }

    #[test]
    fn unknown_group_member() {
        let mut g = groupings();
        g.second.choices.push("Z".to_string());
        assert_eq!(
            compute_scores(&totals(), Some(&g)),
            Err(ScoreError::UnknownChoice {
                group: "GAUCHE".to_string(),
                label: "Z".to_string()
            })
        );
    }

    #[test]
    fn no_registered_voters() {
        let mut b = Builder::new();
        let k = CommuneKey::new("01", "003");
        b.add_station(1, &k, "1", StationCounts::new(0, 0, 0), &[("A", 0)]);
        let scores = compute_scores(&b.build().unwrap(), None).unwrap();
        assert_eq!(scores.row(&k), Some(&[None][..]));
    }

    #[test]
    fn not_clamped() {
        let mut b = Builder::new();
        let k = CommuneKey::new("01", "004");
        b.add_station(1, &k, "1", StationCounts::new(10, 20, 20), &[("A", 20)]);
        let scores = compute_scores(&b.build().unwrap(), None).unwrap();
        assert!(close(scores.score(&k, "A"), 200.0));
    }

    #[test]
    fn oui_example() {
        let mut b = Builder::new();
        let k = CommuneKey::new("75", "056");
        b.add_station(
            1,
            &k,
            "1",
            StationCounts::new(1000, 600, 500),
            &[("OUI", 300), ("NON", 200)],
        );
        let scores = compute_scores(&b.build().unwrap(), None).unwrap();
        assert!(close(scores.score(&k, "OUI"), 30.0));
    }
}
