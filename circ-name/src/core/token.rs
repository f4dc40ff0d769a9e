//! Structural name tokens
//!
//! A token is kept as a structured value (label, per-edge intron flag and
//! boundary modifier) until the final name is rendered. Edges are genomic:
//! `left` faces the circRNA start, `right` faces the circRNA stop. Rendering
//! maps them onto leading/trailing text according to the strand, so
//! minus-strand names mirror plus-strand ones once the token order is
//! reversed.

use std::fmt;

use config::{Strand, NOVEL_EXON, RETAINED_INTRON};

/// L: the circRNA exon is longer than annotated, S: shorter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Longer,
    Shorter,
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryKind::Longer => write!(f, "L"),
            BoundaryKind::Shorter => write!(f, "S"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub kind: BoundaryKind,
    pub offset: u64,
}

impl Boundary {
    /// `extension` > 0 means the circRNA reaches past the canonical edge
    pub fn from_extension(extension: i64) -> Option<Boundary> {
        match extension {
            0 => None,
            e if e > 0 => Some(Boundary {
                kind: BoundaryKind::Longer,
                offset: e.unsigned_abs(),
            }),
            e => Some(Boundary {
                kind: BoundaryKind::Shorter,
                offset: e.unsigned_abs(),
            }),
        }
    }
}

/// genomic side of a token or of the circRNA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Start,
    Stop,
}

/// modifiers attached to one genomic edge of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edge {
    pub flag: bool,
    pub boundary: Option<Boundary>,
}

impl Edge {
    fn lead(&self) -> String {
        let mut acc = String::new();
        if let Some(b) = self.boundary {
            acc.push_str(&format!("[{}]{}", b.offset, b.kind));
        }
        if self.flag {
            acc.push('L');
        }
        acc
    }

    fn trail(&self) -> String {
        let mut acc = String::new();
        if self.flag {
            acc.push('L');
        }
        if let Some(b) = self.boundary {
            acc.push_str(&format!("{}[{}]", b.kind, b.offset));
        }
        acc
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Exon(u32),
    Intron,
    Novel,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Exon(ordinal) => write!(f, "{}", ordinal),
            Label::Intron => write!(f, "{}", RETAINED_INTRON),
            Label::Novel => write!(f, "{}", NOVEL_EXON),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub label: Label,
    pub left: Edge,
    pub right: Edge,
}

impl Token {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            left: Edge::default(),
            right: Edge::default(),
        }
    }

    pub fn exon(ordinal: u32) -> Self {
        Self::new(Label::Exon(ordinal))
    }

    pub fn novel() -> Self {
        Self::new(Label::Novel)
    }

    pub fn is_novel(&self) -> bool {
        self.label == Label::Novel
    }

    pub fn ordinal(&self) -> Option<u32> {
        match self.label {
            Label::Exon(ordinal) => Some(ordinal),
            _ => None,
        }
    }

    pub fn edge_mut(&mut self, side: Side) -> &mut Edge {
        match side {
            Side::Start => &mut self.left,
            Side::Stop => &mut self.right,
        }
    }

    pub fn with_boundary(mut self, side: Side, boundary: Option<Boundary>) -> Self {
        self.edge_mut(side).boundary = boundary;
        self
    }

    /// drop the boundary modifier of one edge, intron flags stay
    pub fn strip(&mut self, side: Side) {
        self.edge_mut(side).boundary = None;
    }

    pub fn is_unmodified(&self) -> bool {
        self.left == Edge::default() && self.right == Edge::default()
    }

    pub fn render(&self, strand: Strand) -> String {
        let (lead, trail) = match strand {
            Strand::Forward => (&self.left, &self.right),
            Strand::Reverse => (&self.right, &self.left),
        };

        format!("{}{}{}", lead.lead(), self.label, trail.trail())
    }
}

/// `circGENE(t1,t2,...)`, tokens listed 5' to 3' along the transcript
pub fn render_name(gene: &str, tokens: &[Token], strand: Strand) -> String {
    let mut rendered = tokens
        .iter()
        .map(|t| t.render(strand))
        .collect::<Vec<_>>();

    if strand.is_reverse() {
        rendered.reverse();
    }

    format!("circ{}({})", gene, rendered.join(","))
}

/// replace one end with a novel exon, keeping the other end intact
pub fn fallback_side(tokens: &mut Vec<Token>, side: Side) {
    if tokens.len() >= 2 {
        match side {
            Side::Start => tokens[0] = Token::novel(),
            Side::Stop => {
                let last = tokens.len() - 1;
                tokens[last] = Token::novel();
            }
        }
        return;
    }

    if let Some(token) = tokens.first_mut() {
        token.strip(side);
    }

    match side {
        Side::Start => tokens.insert(0, Token::novel()),
        Side::Stop => tokens.push(Token::novel()),
    }
}

/// strip both outer boundaries and flank the list with novel exons
pub fn flank_novel(tokens: &mut Vec<Token>) {
    if let Some(first) = tokens.first_mut() {
        first.strip(Side::Start);
    }
    if let Some(last) = tokens.last_mut() {
        last.strip(Side::Stop);
    }

    tokens.insert(0, Token::novel());
    tokens.push(Token::novel());
}
