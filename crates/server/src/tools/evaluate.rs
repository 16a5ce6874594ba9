use std::fmt::Write;

use helpdesk_core::{Category, ClassifierService};

use super::jsonl::SyntheticTicket;

const LABELS: usize = Category::ALL.len();

fn index_of(category: Category) -> usize {
    Category::ALL
        .iter()
        .position(|c| *c == category)
        .unwrap_or(LABELS - 1)
}

/// A ticket the classifier got wrong.
#[derive(Debug, Clone)]
pub struct Mismatch {
    pub subject: String,
    pub expected: Category,
    pub predicted: Category,
}

/// Classifier accuracy over a labelled ticket set.
///
/// `confusion[expected][predicted]` counts tickets, both indexed in
/// [`Category::ALL`] order.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub confusion: [[usize; LABELS]; LABELS],
    pub mismatches: Vec<Mismatch>,
    /// Tickets without a usable label; they are classified but not scored.
    pub unlabelled: usize,
}

impl Default for Evaluation {
    fn default() -> Self {
        Self {
            confusion: [[0; LABELS]; LABELS],
            mismatches: Vec::new(),
            unlabelled: 0,
        }
    }
}

impl Evaluation {
    pub fn record(&mut self, ticket: &SyntheticTicket, predicted: Category) {
        let Some(expected) = ticket.expected_category() else {
            self.unlabelled += 1;
            return;
        };

        self.confusion[index_of(expected)][index_of(predicted)] += 1;
        if expected != predicted {
            self.mismatches.push(Mismatch {
                subject: ticket.subject.clone(),
                expected,
                predicted,
            });
        }
    }

    pub fn scored(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..LABELS).map(|i| self.confusion[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.scored())
    }

    /// Tickets labelled `category`.
    pub fn support(&self, category: Category) -> usize {
        self.confusion[index_of(category)].iter().sum()
    }

    /// Tickets predicted as `category`.
    pub fn predicted(&self, category: Category) -> usize {
        let col = index_of(category);
        self.confusion.iter().map(|row| row[col]).sum()
    }

    pub fn precision(&self, category: Category) -> f64 {
        let i = index_of(category);
        ratio(self.confusion[i][i], self.predicted(category))
    }

    pub fn recall(&self, category: Category) -> f64 {
        let i = index_of(category);
        ratio(self.confusion[i][i], self.support(category))
    }

    pub fn f1(&self, category: Category) -> f64 {
        let (p, r) = (self.precision(category), self.recall(category));
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Plain-text report: per-label scores, the confusion matrix, and the
    /// mismatched tickets.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Classification report");
        let _ = writeln!(
            out,
            "{:<10} {:>9} {:>9} {:>9} {:>8}",
            "label", "precision", "recall", "f1", "support"
        );
        for category in Category::ALL {
            let _ = writeln!(
                out,
                "{:<10} {:>9.2} {:>9.2} {:>9.2} {:>8}",
                category.as_str(),
                self.precision(category),
                self.recall(category),
                self.f1(category),
                self.support(category)
            );
        }
        let _ = writeln!(
            out,
            "accuracy {:.2} ({}/{}), {} unlabelled",
            self.accuracy(),
            self.correct(),
            self.scored(),
            self.unlabelled
        );

        let _ = writeln!(out, "\nConfusion matrix (rows: expected, columns: predicted)");
        let _ = write!(out, "{:<10}", "");
        for category in Category::ALL {
            let _ = write!(out, " {:>9}", category.as_str());
        }
        let _ = writeln!(out);
        for (i, category) in Category::ALL.iter().enumerate() {
            let _ = write!(out, "{:<10}", category.as_str());
            for count in self.confusion[i] {
                let _ = write!(out, " {:>9}", count);
            }
            let _ = writeln!(out);
        }

        if !self.mismatches.is_empty() {
            let _ = writeln!(out, "\nMismatches");
            for m in &self.mismatches {
                let _ = writeln!(
                    out,
                    "  {} | expected {} | predicted {}",
                    m.subject, m.expected, m.predicted
                );
            }
        }

        out
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Classify up to `limit` tickets one at a time and score the results.
pub async fn evaluate(
    classifier: &ClassifierService,
    tickets: &[SyntheticTicket],
    limit: usize,
) -> Evaluation {
    let mut evaluation = Evaluation::default();
    for ticket in tickets.iter().take(limit) {
        let predicted = classifier.classify(&ticket.subject, &ticket.body).await;
        evaluation.record(ticket, predicted);
    }
    evaluation
}
