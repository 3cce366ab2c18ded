/// A half-open range of tap stages, `(from, to]`.
///
/// An open `from` also admits taps at the lowest possible stage, and an
/// open `to` admits everything above `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageRange {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

impl StageRange {
    /// Every stage.
    pub const ALL: StageRange = StageRange {
        from: None,
        to: None,
    };

    pub const fn new(from: Option<i32>, to: Option<i32>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, stage: i32) -> bool {
        self.from.is_none_or(|from| stage > from) && self.to.is_none_or(|to| stage <= to)
    }

    /// Whether this range starts at the lowest stage.
    pub fn is_first(&self) -> bool {
        self.from.is_none()
    }

    /// Whether this range runs up to the highest stage.
    pub fn is_last(&self) -> bool {
        self.to.is_none()
    }
}
