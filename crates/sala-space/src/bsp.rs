//! Binary space partition over tagged line segments.
//!
//! Nodes live in an arena and refer to their children by index. The
//! tree is built iteratively from an explicit work stack so that long
//! runs of lines falling on one side cannot exhaust the call stack.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sala_core::comm::{Cancelled, Communicator, Progress};
use sala_core::geometry::{det, dist, intersect_line_no_touch, intersection_point, Line, Point2f, TaggedLine};

/// Which side of a node's line a point falls on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Anticlockwise of the line (cross product non-negative).
    Left,
    /// Clockwise of the line.
    Right,
}

/// Options for [`BspTree::build`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BspConfig {
    /// Seed for the generator that picks splitting lines in small sets.
    pub seed: u64,
}

impl Default for BspConfig {
    fn default() -> Self {
        Self { seed: 0x5a1a }
    }
}

/// One partition node.
#[derive(Clone, Debug)]
pub struct BspNode {
    line: Line,
    tag: i32,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

impl BspNode {
    /// The splitting line.
    pub fn line(&self) -> &Line {
        &self.line
    }

    /// Tag of the input line the splitting line came from.
    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// Index of the parent node.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Index of the left child.
    pub fn left(&self) -> Option<usize> {
        self.left
    }

    /// Index of the right child.
    pub fn right(&self) -> Option<usize> {
        self.right
    }

    /// Classify `p` against this node's line.
    pub fn classify(&self, p: Point2f) -> Side {
        let v0 = (self.line.end() - self.line.start()).normalised();
        let v1 = (p - self.line.start()).normalised();
        if det(v0, v1) >= 0.0 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// An immutable BSP tree.
#[derive(Clone, Debug, Default)]
pub struct BspTree {
    nodes: Vec<BspNode>,
}

impl BspTree {
    /// Build a tree, seeding a ChaCha8 generator from `config`.
    pub fn build(
        lines: &[TaggedLine],
        config: &BspConfig,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<Self, Cancelled> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::build_with_rng(lines, &mut rng, comm)
    }

    /// Build a tree drawing random choices from `rng`.
    ///
    /// The communicator is polled for cancellation on every node; progress
    /// is posted at most twice a second. An empty input yields an empty tree.
    pub fn build_with_rng<R: Rng>(
        lines: &[TaggedLine],
        rng: &mut R,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<Self, Cancelled> {
        let mut tree = Self::default();
        if lines.is_empty() {
            return Ok(tree);
        }
        let mut progress = Progress::new(comm);

        tree.nodes.push(BspNode {
            line: Line::default(),
            tag: -1,
            parent: None,
            left: None,
            right: None,
        });
        let mut stack = vec![(0usize, tree.split(0, lines, rng))];

        let mut count = 0usize;
        while let Some((here, (leftlines, rightlines))) = stack.pop() {
            count += 1;
            progress.check()?;
            progress.tick(count)?;

            if !leftlines.is_empty() {
                let child = tree.push_child(here);
                tree.nodes[here].left = Some(child);
                let parts = tree.split(child, &leftlines, rng);
                stack.push((child, parts));
            }
            if !rightlines.is_empty() {
                let child = tree.push_child(here);
                tree.nodes[here].right = Some(child);
                let parts = tree.split(child, &rightlines, rng);
                stack.push((child, parts));
            }
        }
        log::debug!("bsp tree: {} input lines, {} nodes", lines.len(), tree.nodes.len());
        Ok(tree)
    }

    fn push_child(&mut self, parent: usize) -> usize {
        self.nodes.push(BspNode {
            line: Line::default(),
            tag: -1,
            parent: Some(parent),
            left: None,
            right: None,
        });
        self.nodes.len() - 1
    }

    /// Choose the splitting line for node `at` and partition the rest.
    fn split<R: Rng>(
        &mut self,
        at: usize,
        lines: &[TaggedLine],
        rng: &mut R,
    ) -> (Vec<TaggedLine>, Vec<TaggedLine>) {
        let parent = self.nodes[at].parent.map(|p| self.nodes[p].line);
        let chosen = if lines.len() > 3 {
            pick_midpoint_line(lines, parent.as_ref())
        } else {
            rng.random_range(0..lines.len())
        };
        self.nodes[at].line = lines[chosen].line;
        self.nodes[at].tag = lines[chosen].tag;
        partition(lines, chosen)
    }

    /// True if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Index of the root node.
    pub fn root(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(0)
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> &BspNode {
        &self.nodes[index]
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[BspNode] {
        &self.nodes
    }

    /// Walk from the root towards `p` and return the visited nodes with
    /// the side `p` fell on at each. The last entry has no child on that side.
    pub fn locate(&self, p: Point2f) -> Vec<(usize, Side)> {
        let mut path = Vec::new();
        let mut here = self.root();
        while let Some(at) = here {
            let node = &self.nodes[at];
            let side = node.classify(p);
            path.push((at, side));
            here = match side {
                Side::Left => node.left,
                Side::Right => node.right,
            };
        }
        path
    }

    /// True if any partitioned line crosses the open segment `p`-`q`.
    ///
    /// Lines that only touch the segment do not occlude it. Subtrees lying
    /// wholly on the far side of a node's line from both points are skipped.
    pub fn occludes(&self, p: Point2f, q: Point2f) -> bool {
        let sight = Line::new(p, q);
        let mut stack: Vec<usize> = self.root().into_iter().collect();
        while let Some(at) = stack.pop() {
            let node = &self.nodes[at];
            let (sp, sq) = (node.classify(p), node.classify(q));
            if sp != sq && intersect_line_no_touch(&node.line, &sight, 0.0) {
                return true;
            }
            if sp == Side::Left || sq == Side::Left {
                stack.extend(node.left);
            }
            if sp == Side::Right || sq == Side::Right {
                stack.extend(node.right);
            }
        }
        false
    }
}

/// Index of the line whose midpoint is closest to the mean of all endpoints.
///
/// Lines perpendicular-ish to the parent's splitting line are preferred:
/// tall lines under a wide (or absent) parent, wide lines under a tall
/// one. If no line qualifies, every line is considered. Ties keep the
/// first candidate.
pub fn pick_midpoint_line(lines: &[TaggedLine], parent: Option<&Line>) -> usize {
    let mut midpoint = Point2f::default();
    for l in lines {
        midpoint += l.line.start() + l.line.end();
    }
    midpoint = midpoint / (2.0 * lines.len() as f64);
    let ver = !matches!(parent, Some(p) if p.height() > p.width());

    let nearest = |accept: &dyn Fn(&Line) -> bool| {
        let mut chosen: Option<(usize, f64)> = None;
        for (i, l) in lines.iter().enumerate() {
            if !accept(&l.line) {
                continue;
            }
            let d = dist(l.line.midpoint(), midpoint);
            if chosen.is_none_or(|(_, best)| d < best) {
                chosen = Some((i, d));
            }
        }
        chosen.map(|(i, _)| i)
    };
    let oriented = if ver {
        nearest(&|l: &Line| l.height() > l.width())
    } else {
        nearest(&|l: &Line| l.width() > l.height())
    };
    oriented.or_else(|| nearest(&|_: &Line| true)).unwrap_or(0)
}

/// Split `lines` about `lines[chosen]` into (left, right) sets.
///
/// Lines straddling the chosen line are cut at the crossing and each
/// non-degenerate fragment is sent to its own side with the original tag.
pub fn partition(lines: &[TaggedLine], chosen: usize) -> (Vec<TaggedLine>, Vec<TaggedLine>) {
    let mut leftlines = Vec::new();
    let mut rightlines = Vec::new();
    let chosen_line = lines[chosen].line;
    let v0 = (chosen_line.end() - chosen_line.start()).normalised();

    for (i, t) in lines.iter().enumerate() {
        if i == chosen {
            continue;
        }
        let test = t.line;
        let a = if test.start() == chosen_line.start() {
            0.0
        } else {
            det(v0, (test.start() - chosen_line.start()).normalised())
        };
        let b = if test.end() == chosen_line.start() {
            0.0
        } else {
            det(v0, (test.end() - chosen_line.start()).normalised())
        };
        if a >= 0.0 && b >= 0.0 {
            leftlines.push(*t);
        } else if a <= 0.0 && b <= 0.0 {
            rightlines.push(*t);
        } else {
            let p = intersection_point(&chosen_line, &test, 0.0);
            let x = Line::new(test.start(), p);
            let y = Line::new(p, test.end());
            let (first, second) = if a >= 0.0 {
                (&mut leftlines, &mut rightlines)
            } else {
                (&mut rightlines, &mut leftlines)
            };
            if x.length() > 0.0 {
                first.push(TaggedLine::new(x, t.tag));
            }
            if y.length() > 0.0 {
                second.push(TaggedLine::new(y, t.tag));
            }
        }
    }
    (leftlines, rightlines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sala_core::geometry::approx_eq;

    fn tl(ax: f64, ay: f64, bx: f64, by: f64) -> TaggedLine {
        TaggedLine::new(Line::new(Point2f::new(ax, ay), Point2f::new(bx, by)), 0)
    }

    fn same_line(a: &Line, b: &Line) -> bool {
        approx_eq(a.start(), b.start(), 1e-3) && approx_eq(a.end(), b.end(), 1e-3)
    }

    fn row_of_four() -> Vec<TaggedLine> {
        vec![
            tl(1.0, 2.0, 2.0, 2.0),
            tl(2.0, 2.0, 3.0, 2.0),
            tl(3.0, 2.0, 4.0, 2.0),
            tl(4.0, 2.0, 5.0, 2.0),
        ]
    }

    // ── Midpoint selection tests ────────────────────────────────

    #[test]
    fn middle_of_three_collinear_lines() {
        let lines = &row_of_four()[..3];
        assert_eq!(pick_midpoint_line(lines, None), 1);
    }

    #[test]
    fn additional_lines_shift_choice() {
        let mut lines = row_of_four();
        assert_eq!(pick_midpoint_line(&lines, None), 1);
        lines.push(tl(5.0, 1.0, 6.0, 1.0));
        assert_eq!(pick_midpoint_line(&lines, None), 2);
        lines.push(tl(15.0, 4.0, 15.0, 0.0));
        assert_eq!(pick_midpoint_line(&lines, None), 5);
    }

    #[test]
    fn nearest_tall_line_preferred() {
        let mut lines: Vec<_> = row_of_four()[..3].to_vec();
        lines.push(tl(4.5, 1.0, 4.5, 3.0));
        lines.push(tl(5.0, 2.0, 6.0, 2.0));
        lines.push(tl(6.0, 2.0, 7.0, 2.0));
        lines.push(tl(6.5, 1.0, 6.5, 3.0));
        assert_eq!(pick_midpoint_line(&lines, None), 3);
    }

    #[test]
    fn tall_parent_prefers_wide_lines() {
        let lines = vec![
            tl(0.0, 0.0, 0.0, 2.0),
            tl(0.0, 1.0, 2.0, 1.0),
            tl(3.0, 0.0, 3.0, 2.0),
            tl(5.0, 0.0, 5.0, 2.0),
        ];
        let parent = Line::new(Point2f::new(10.0, 0.0), Point2f::new(10.0, 5.0));
        assert_eq!(pick_midpoint_line(&lines, Some(&parent)), 1);
    }

    // ── Partition tests ─────────────────────────────────────────

    #[test]
    fn collinear_lines_all_left() {
        let lines = row_of_four();
        let chosen = pick_midpoint_line(&lines, None);
        let (left, right) = partition(&lines, chosen);
        assert_eq!(left.len(), 3);
        assert!(right.is_empty());
        assert!(same_line(&left[0].line, &lines[0].line));
        assert!(same_line(&left[1].line, &lines[2].line));
        assert!(same_line(&left[2].line, &lines[3].line));
    }

    #[test]
    fn line_below_goes_right() {
        let mut lines = row_of_four();
        lines.push(tl(5.0, 1.0, 6.0, 1.0));
        let (left, right) = partition(&lines, pick_midpoint_line(&lines, None));
        assert_eq!(left.len(), 3);
        assert_eq!(right.len(), 1);
        assert!(same_line(&right[0].line, &lines[4].line));
    }

    #[test]
    fn straddling_line_is_split() {
        let mut lines = row_of_four();
        lines.push(tl(5.5, 1.0, 5.5, 3.0));
        for x in 6..10 {
            let x = f64::from(x);
            lines.push(tl(x, 2.0, x + 1.0, 2.0));
        }
        lines.push(tl(3.0, -2.0, 6.0, -2.0));
        let chosen = pick_midpoint_line(&lines, None);
        assert_eq!(chosen, 4);
        let (left, right) = partition(&lines, chosen);
        assert_eq!(left.len(), 5);
        assert_eq!(right.len(), 5);
        assert!(same_line(&left[4].line, &Line::new(Point2f::new(3.0, -2.0), Point2f::new(5.5, -2.0))));
        assert!(same_line(&right[4].line, &Line::new(Point2f::new(5.5, -2.0), Point2f::new(6.0, -2.0))));
    }

    // ── Tree tests ──────────────────────────────────────────────

    #[test]
    fn empty_input_gives_empty_tree() {
        let tree = BspTree::build(&[], &BspConfig::default(), None).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn horizontal_row_builds_left_spine() {
        let lines = row_of_four();
        let tree = BspTree::build(&lines, &BspConfig::default(), None).unwrap();
        let root = tree.node(0);
        assert!(same_line(root.line(), &lines[1].line));
        assert!(root.right().is_none());
        let mut depth = 0;
        let mut here = tree.root();
        while let Some(i) = here {
            assert!(tree.node(i).right().is_none());
            here = tree.node(i).left();
            depth += 1;
        }
        assert_eq!(depth, 4);
    }

    #[test]
    fn same_seed_same_tree() {
        let lines = vec![
            tl(0.0, 0.0, 1.0, 1.0),
            tl(2.0, 0.0, 1.0, 3.0),
            tl(-1.0, 2.0, 4.0, 2.5),
        ];
        let cfg = BspConfig { seed: 42 };
        let a = BspTree::build(&lines, &cfg, None).unwrap();
        let b = BspTree::build(&lines, &cfg, None).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.nodes().iter().zip(b.nodes()) {
            assert_eq!(x.line(), y.line());
        }
    }

    struct CancelAll;
    impl Communicator for CancelAll {
        fn post(&mut self, _: sala_core::ProgressKind, _: usize) {}
        fn is_cancelled(&self) -> bool {
            true
        }
    }

    #[test]
    fn cancelled_build_fails() {
        let mut c = CancelAll;
        let r = BspTree::build(&row_of_four(), &BspConfig::default(), Some(&mut c));
        assert_eq!(r.unwrap_err(), Cancelled);
    }

    #[test]
    fn classify_uses_line_direction() {
        let lines = vec![tl(0.0, 0.0, 2.0, 0.0)];
        let tree = BspTree::build(&lines, &BspConfig::default(), None).unwrap();
        let n = tree.node(0);
        assert_eq!(n.classify(Point2f::new(1.0, 1.0)), Side::Left);
        assert_eq!(n.classify(Point2f::new(1.0, -1.0)), Side::Right);
    }

    // ── Query tests ─────────────────────────────────────────────

    fn walled_room() -> BspTree {
        let lines = vec![
            tl(0.0, 0.0, 10.0, 0.0),
            tl(10.0, 0.0, 10.0, 10.0),
            tl(10.0, 10.0, 0.0, 10.0),
            tl(0.0, 10.0, 0.0, 0.0),
            tl(5.0, 0.0, 5.0, 6.0),
        ];
        BspTree::build(&lines, &BspConfig::default(), None).unwrap()
    }

    #[test]
    fn partition_wall_occludes_sight() {
        let tree = walled_room();
        assert!(tree.occludes(Point2f::new(2.0, 3.0), Point2f::new(8.0, 3.0)));
        assert!(!tree.occludes(Point2f::new(2.0, 8.0), Point2f::new(8.0, 8.0)));
        assert!(!tree.occludes(Point2f::new(1.0, 1.0), Point2f::new(4.0, 9.0)));
    }

    #[test]
    fn sight_ending_on_a_wall_is_not_occluded() {
        let tree = walled_room();
        assert!(!tree.occludes(Point2f::new(2.0, 3.0), Point2f::new(5.0, 3.0)));
    }

    #[test]
    fn locate_ends_where_no_child_remains() {
        let tree = walled_room();
        let path = tree.locate(Point2f::new(2.0, 3.0));
        assert_eq!(path.first().map(|(i, _)| *i), tree.root());
        let (last, side) = *path.last().unwrap();
        let node = tree.node(last);
        let next = match side {
            Side::Left => node.left(),
            Side::Right => node.right(),
        };
        assert!(next.is_none());
        assert!(BspTree::default().locate(Point2f::new(0.0, 0.0)).is_empty());
    }

    proptest! {
        #[test]
        fn every_line_is_placed(
            coords in prop::collection::vec((0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0), 1..24),
            seed in any::<u64>(),
        ) {
            let lines: Vec<TaggedLine> = coords
                .iter()
                .enumerate()
                .filter(|(_, c)| (c.0, c.1) != (c.2, c.3))
                .map(|(i, c)| TaggedLine::new(Line::new(Point2f::new(c.0, c.1), Point2f::new(c.2, c.3)), i as i32))
                .collect();
            prop_assume!(!lines.is_empty());
            let tree = BspTree::build(&lines, &BspConfig { seed }, None).unwrap();
            // every input tag must be the splitting line of some node
            for l in &lines {
                prop_assert!(tree.nodes().iter().any(|n| n.tag() == l.tag));
            }
            prop_assert!(tree.len() >= lines.len());
        }

        #[test]
        fn partition_keeps_every_line_on_its_side(
            coords in prop::collection::vec((0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0), 2..24),
            pick in any::<prop::sample::Index>(),
        ) {
            let lines: Vec<TaggedLine> = coords
                .iter()
                .enumerate()
                .filter(|(_, c)| (c.0 - c.2).abs() + (c.1 - c.3).abs() > 1e-3)
                .map(|(i, c)| TaggedLine::new(Line::new(Point2f::new(c.0, c.1), Point2f::new(c.2, c.3)), i as i32))
                .collect();
            prop_assume!(lines.len() >= 2);
            let chosen = pick.index(lines.len());
            let base = lines[chosen].line;
            let v0 = (base.end() - base.start()).normalised();
            let side = |q: Point2f| {
                if q == base.start() {
                    0.0
                } else {
                    det(v0, (q - base.start()).normalised())
                }
            };

            let straddlers = lines
                .iter()
                .enumerate()
                .filter(|&(i, t)| {
                    let (a, b) = (side(t.line.start()), side(t.line.end()));
                    i != chosen && ((a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0))
                })
                .count();
            let (left, right) = partition(&lines, chosen);
            prop_assert_eq!(left.len() + right.len(), lines.len() - 1 + straddlers);

            for t in &left {
                prop_assert!(side(t.line.start()) >= -1e-6 && side(t.line.end()) >= -1e-6);
            }
            for t in &right {
                prop_assert!(side(t.line.start()) <= 1e-6 && side(t.line.end()) <= 1e-6);
            }
        }
    }
}
