/// `coef · op_1(site_1) · op_2(site_2) · ...` with 1-based site indices.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub coef: f64,
    pub ops: Vec<(String, usize)>,
}

/// Ordered list of weighted operator strings, in the spirit of AutoMPO.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TermList {
    terms: Vec<Term>,
}

impl TermList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, coef: f64, ops: &[(&str, usize)]) -> &mut Self {
        self.terms.push(Term {
            coef,
            ops: ops.iter().map(|(name, site)| (name.to_string(), *site)).collect(),
        });
        self
    }

    /// `coef · op(i)`.
    pub fn one_site(&mut self, coef: f64, op: &str, i: usize) -> &mut Self {
        self.add(coef, &[(op, i)])
    }

    /// `coef · a(i) b(j)`.
    pub fn two_site(&mut self, coef: f64, a: &str, i: usize, b: &str, j: usize) -> &mut Self {
        self.add(coef, &[(a, i), (b, j)])
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }
}

impl<'a> IntoIterator for &'a TermList {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}
