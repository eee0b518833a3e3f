//! Greedy reduction of an all-line map to a fewest-line map.
//!
//! Two passes run over the same state. The first removes lines whose
//! connections are a subset of a neighbour's; the second removes whatever
//! else it can, fewest connections and shortest first. Neither pass may
//! remove a line that is the last to reach a convex corner's neighbourhood
//! or the last to cross a gap between outlines, unless two remaining
//! lines meet inside that gap.

use std::collections::BTreeSet;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use sala_core::geometry::{intersection_point, TOLERANCE_A};
use sala_core::Line;

use crate::config::MinimiserConfig;
use crate::polygons::RadialLine;

/// The gap between two consecutive radial lines at one corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RadialSegment {
    /// Radial line index of the later bound.
    pub a: usize,
    /// Radial line index of the earlier bound.
    pub b: usize,
}

/// Everything the reduction reads about an all-line map.
#[derive(Clone, Debug, Default)]
pub struct Divisions {
    /// Radial lines in key order.
    pub radial_lines: Vec<RadialLine>,
    /// Per radial line, the all-line indices that cross it.
    pub radial_divisions: Vec<BTreeSet<usize>>,
    /// Gaps between consecutive radial lines.
    pub radial_segs: Vec<RadialSegment>,
    /// Per all-line, the gaps it crosses.
    pub ax_seg_cuts: Vec<BTreeSet<usize>>,
    /// Per all-line, the key vertices of its neighbours, sorted.
    pub key_vertex_conns: Vec<Vec<usize>>,
    /// Per key vertex, how many lines list it in `key_vertex_conns`.
    pub key_vertex_counts: Vec<usize>,
}

/// Reduction state over one all-line map.
#[derive(Debug)]
pub struct AxialMinimiser<'a> {
    lines: &'a [Line],
    divisions: &'a Divisions,
    conns: Vec<Vec<usize>>,
    key_vertex_counts: Vec<usize>,
    radial_seg_counts: Vec<usize>,
    removed: Vec<bool>,
    affected: Vec<bool>,
    vital: Vec<bool>,
    rng: ChaCha8Rng,
}

impl<'a> AxialMinimiser<'a> {
    /// State for `lines` with their sorted `connections`.
    pub fn new(lines: &'a [Line], connections: Vec<Vec<usize>>, divisions: &'a Divisions, config: &MinimiserConfig) -> Self {
        let n = lines.len();
        let mut radial_seg_counts = vec![0; divisions.radial_segs.len()];
        for cuts in &divisions.ax_seg_cuts {
            for &cut in cuts {
                radial_seg_counts[cut] += 1;
            }
        }
        Self {
            lines,
            divisions,
            conns: connections,
            key_vertex_counts: divisions.key_vertex_counts.clone(),
            radial_seg_counts,
            removed: vec![false; n],
            affected: vec![true; n],
            vital: vec![false; n],
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Whether line `i` has been removed.
    pub fn removed(&self, i: usize) -> bool {
        self.removed.get(i).copied().unwrap_or(false)
    }

    /// Number of lines removed so far.
    pub fn removed_count(&self) -> usize {
        self.removed.iter().filter(|&&r| r).count()
    }

    fn ordered(&mut self, candidates: Vec<usize>) -> Vec<usize> {
        let mut order = candidates;
        order.shuffle(&mut self.rng);
        let key = |i: usize| (self.conns[i].len(), self.lines[i].length() as f32);
        order.sort_by(|&x, &y| {
            let (cx, lx) = key(x);
            let (cy, ly) = key(y);
            cx.cmp(&cy).then_with(|| lx.total_cmp(&ly))
        });
        order
    }

    fn reaches_last_key_vertex(&self, i: usize) -> bool {
        self.divisions
            .key_vertex_conns
            .get(i)
            .is_some_and(|kv| kv.iter().any(|&k| self.key_vertex_counts[k] <= 1))
    }

    fn is_subset_of_neighbour(&self, ii: usize) -> bool {
        let axa = &self.conns[ii];
        for &b in axa {
            if b == ii || self.removed[b] {
                continue;
            }
            let axb = &self.conns[b];
            if axa.len() > axb.len() {
                continue;
            }
            // the link between the pair counts as shared
            let mut coconnecting = 1;
            let (mut ai, mut bi) = (0, 0);
            while ai < axa.len() && bi < axb.len() {
                if axa[ai] == b {
                    ai += 1;
                    if ai >= axa.len() {
                        break;
                    }
                }
                while bi < axb.len() && (axb[bi] == ii || axa[ai] > axb[bi]) {
                    bi += 1;
                }
                if bi >= axb.len() {
                    break;
                }
                if axa[ai] == axb[bi] {
                    coconnecting += 1;
                } else if axa[ai] < axb[bi] {
                    break;
                }
                ai += 1;
                bi += 1;
            }
            if coconnecting >= axa.len() {
                return true;
            }
        }
        false
    }

    fn crosses_last_gap(&self, i: usize) -> bool {
        let Some(cuts) = self.divisions.ax_seg_cuts.get(i) else {
            return false;
        };
        cuts.iter().any(|&c| self.radial_seg_counts[c] <= 1) && self.check_vital(i)
    }

    /// True unless every gap that only `check` crosses is also covered by
    /// two other remaining lines meeting inside it.
    fn check_vital(&self, check: usize) -> bool {
        let d = self.divisions;
        let mut vital_segs = 0;
        let mut covered = 0;
        for &cut in &d.ax_seg_cuts[check] {
            if self.radial_seg_counts[cut] > 1 {
                continue;
            }
            vital_segs += 1;
            let seg = d.radial_segs[cut];
            let rline_a = &d.radial_lines[seg.a];
            let rline_b = &d.radial_lines[seg.b];
            let mut nonvital = false;
            for &diva in &d.radial_divisions[seg.a] {
                if diva == check || self.removed[diva] {
                    continue;
                }
                for &divb in &d.radial_divisions[seg.b] {
                    if divb == check || self.removed[divb] || !self.conns[diva].contains(&divb) {
                        continue;
                    }
                    let p = intersection_point(&self.lines[diva], &self.lines[divb], TOLERANCE_A);
                    if p.in_segment(rline_a.keyvertex, rline_a.openspace, rline_b.openspace, TOLERANCE_A) {
                        nonvital = true;
                    }
                }
            }
            if nonvital {
                covered += 1;
            }
        }
        covered != vital_segs
    }

    fn remove(&mut self, i: usize) {
        self.removed[i] = true;
        let neighbours = self.conns[i].clone();
        for n in neighbours {
            if !self.removed[n] {
                self.conns[n].retain(|&c| c != i);
                self.affected[n] = true;
            }
        }
        if let Some(cuts) = self.divisions.ax_seg_cuts.get(i) {
            for &cut in cuts {
                self.radial_seg_counts[cut] -= 1;
            }
        }
        if let Some(kv) = self.divisions.key_vertex_conns.get(i) {
            for &k in kv {
                self.key_vertex_counts[k] -= 1;
            }
        }
    }

    /// Remove lines whose connections are covered by a neighbour's, until
    /// nothing more changes.
    pub fn remove_subsets(&mut self) {
        let order = self.ordered((0..self.lines.len()).collect());
        let mut changed = true;
        while changed {
            changed = false;
            for &ii in &order {
                if self.removed[ii] || !self.affected[ii] || self.vital[ii] {
                    continue;
                }
                if self.reaches_last_key_vertex(ii) {
                    self.vital[ii] = true;
                    continue;
                }
                self.affected[ii] = false;
                if !self.is_subset_of_neighbour(ii) {
                    continue;
                }
                if self.crosses_last_gap(ii) {
                    self.vital[ii] = true;
                    continue;
                }
                self.remove(ii);
                changed = true;
            }
        }
        log::debug!("fewest-line subsets: removed {} of {} lines", self.removed_count(), self.lines.len());
    }

    /// Remove any remaining line that is not needed, fewest connections and
    /// shortest first, never leaving a neighbour with a single connection.
    pub fn fewest_longest(&mut self) {
        let live = (0..self.lines.len()).filter(|&i| !self.removed[i] && !self.vital[i]).collect();
        let order = self.ordered(live);
        for j in order {
            if self.reaches_last_key_vertex(j) || self.crosses_last_gap(j) {
                continue;
            }
            let strands = self.conns[j]
                .iter()
                .any(|&n| !self.removed[n] && self.conns[n].len() <= 2);
            if strands {
                continue;
            }
            self.remove(j);
        }
        log::debug!("fewest-line minimal: removed {} of {} lines", self.removed_count(), self.lines.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sala_test_utils::fixtures::p;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Line {
        Line::new(p(x0, y0), p(x1, y1))
    }

    // ── Subset tests ────────────────────────────────────────────

    #[test]
    fn triangle_keeps_its_longest_line() {
        let lines = [line(0.0, 0.0, 3.0, 0.0), line(0.0, 1.0, 4.0, 1.0), line(0.0, 2.0, 5.0, 2.0)];
        let conns = vec![vec![1, 2], vec![0, 2], vec![0, 1]];
        let d = Divisions::default();
        let mut m = AxialMinimiser::new(&lines, conns, &d, &MinimiserConfig::default());
        m.remove_subsets();
        assert!(m.removed(0));
        assert!(m.removed(1));
        assert!(!m.removed(2));
    }

    #[test]
    fn last_line_to_a_key_vertex_is_kept() {
        let lines = [line(0.0, 0.0, 1.0, 0.0), line(0.0, 0.0, 2.0, 0.0), line(0.5, -1.0, 0.5, 1.0)];
        let conns = vec![vec![2], vec![2], vec![0, 1]];
        let d = Divisions {
            key_vertex_conns: vec![vec![0], vec![], vec![]],
            key_vertex_counts: vec![1],
            ..Divisions::default()
        };
        let mut m = AxialMinimiser::new(&lines, conns, &d, &MinimiserConfig::default());
        m.remove_subsets();
        assert!(!m.removed(0));
        assert!(m.removed(1));
    }

    #[test]
    fn sole_gap_crossing_is_kept() {
        let lines = [line(0.0, 0.0, 1.0, 0.0), line(0.0, 0.5, 2.0, 0.5), line(0.5, -1.0, 0.5, 1.0)];
        let conns = vec![vec![2], vec![2], vec![0, 1]];
        let radial = RadialLine::new(crate::polygons::AxialVertexKey::new(0), false, p(0.0, 0.0), p(1.0, 1.0), p(2.0, 1.0));
        let d = Divisions {
            radial_lines: vec![radial, radial],
            radial_divisions: vec![BTreeSet::from([1]), BTreeSet::from([1])],
            radial_segs: vec![RadialSegment { a: 1, b: 0 }],
            ax_seg_cuts: vec![BTreeSet::new(), BTreeSet::from([0]), BTreeSet::new()],
            ..Divisions::default()
        };
        let mut m = AxialMinimiser::new(&lines, conns, &d, &MinimiserConfig::default());
        m.remove_subsets();
        assert!(!m.removed(1));
        assert!(m.removed(0));
    }

    // ── Fewest-longest tests ────────────────────────────────────

    #[test]
    fn neighbours_are_never_stranded() {
        // a chain 0 - 1 - 2: removing 0 or 2 would leave 1 with one link
        let lines = [line(0.0, 0.0, 0.0, 2.0), line(-1.0, 1.0, 5.0, 1.0), line(4.0, 0.0, 4.0, 2.0)];
        let conns = vec![vec![1], vec![0, 2], vec![1]];
        let d = Divisions::default();
        let mut m = AxialMinimiser::new(&lines, conns, &d, &MinimiserConfig::default());
        m.fewest_longest();
        assert_eq!(m.removed_count(), 0);
    }

    #[test]
    fn same_seed_same_result() {
        let lines = [line(0.0, 0.0, 3.0, 0.0), line(0.0, 1.0, 3.0, 1.0), line(0.0, 2.0, 3.0, 2.0)];
        let conns = vec![vec![1, 2], vec![0, 2], vec![0, 1]];
        let d = Divisions::default();
        let run = |seed| {
            let mut m = AxialMinimiser::new(&lines, conns.clone(), &d, &MinimiserConfig::with_seed(seed));
            m.remove_subsets();
            m.fewest_longest();
            (0..3).map(|i| m.removed(i)).collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
        assert_eq!(run(7).iter().filter(|&&r| r).count(), 2);
    }
}
