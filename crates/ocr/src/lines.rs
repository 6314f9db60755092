use tillscan_core::{LineConfig, LineGroup, LineStrategy, WordAnnotation};
use tracing::debug;

/// Groups word boxes into printed lines by their vertical position.
#[derive(Debug, Clone, Default)]
pub struct LineReconstructor {
    config: LineConfig,
}

impl LineReconstructor {
    pub fn new(config: LineConfig) -> Self {
        Self { config }
    }

    pub fn with_tolerance(tolerance: i32) -> Self {
        Self::new(LineConfig { tolerance, ..LineConfig::default() })
    }

    /// Cluster `annotations` into lines, top to bottom, each left to right.
    ///
    /// With [`LineStrategy::Greedy`] a word joins the first group whose anchor
    /// is strictly closer than the tolerance, scanning groups in creation
    /// order. Anchors never move, so membership is not transitive and depends
    /// on input order. [`LineStrategy::Sorted`] visits words by y instead and
    /// gives the same grouping for any permutation of the input.
    pub fn reconstruct(&self, annotations: &[WordAnnotation]) -> Vec<LineGroup> {
        let mut groups = match self.config.strategy {
            LineStrategy::Greedy => self.greedy(annotations),
            LineStrategy::Sorted => self.sorted(annotations),
        };

        groups.sort_by_key(|g| g.anchor_y);
        for g in &mut groups {
            g.sort_words();
        }
        debug!(words = annotations.len(), lines = groups.len(), "Reconstructed text lines");
        groups
    }

    fn greedy(&self, annotations: &[WordAnnotation]) -> Vec<LineGroup> {
        let mut groups: Vec<LineGroup> = Vec::new();
        for word in annotations {
            let y = word.line_y();
            match groups.iter_mut().find(|g| self.within_tolerance(y, g.anchor_y)) {
                Some(group) => group.push(word.left_x(), word.text.trim()),
                None => {
                    let mut group = LineGroup::new(y);
                    group.push(word.left_x(), word.text.trim());
                    groups.push(group);
                }
            }
        }
        groups
    }

    fn within_tolerance(&self, y: i32, anchor_y: i32) -> bool {
        (i64::from(y) - i64::from(anchor_y)).abs() < i64::from(self.config.tolerance)
    }

    fn sorted(&self, annotations: &[WordAnnotation]) -> Vec<LineGroup> {
        let mut order: Vec<&WordAnnotation> = annotations.iter().collect();
        order.sort_by_key(|w| (w.line_y(), w.left_x()));

        let mut groups: Vec<LineGroup> = Vec::new();
        for word in order {
            let y = word.line_y();
            match groups.last_mut() {
                Some(group) if self.within_tolerance(y, group.anchor_y) => {
                    group.push(word.left_x(), word.text.trim());
                }
                _ => {
                    let mut group = LineGroup::new(y);
                    group.push(word.left_x(), word.text.trim());
                    groups.push(group);
                }
            }
        }
        groups
    }
}
