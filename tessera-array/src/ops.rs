use tessera_error::TesseraResult;

/// Element-wise addition with null propagation.
///
/// The non-mutating [`ArrayAdd::add`] clones the receiver; the clone shares
/// storage, so the in-place operator's copy-on-write detach leaves the
/// original untouched.
pub trait ArrayAdd<Rhs = Self>: Clone {
    /// Add `rhs` into `self`, detaching from shared storage first.
    fn add_assign(&mut self, rhs: &Rhs) -> TesseraResult<()>;

    /// Add `rhs` to a copy of `self`.
    fn add(&self, rhs: &Rhs) -> TesseraResult<Self> {
        let mut out = self.clone();
        out.add_assign(rhs)?;
        Ok(out)
    }
}

/// Element-wise division with null propagation, for arrays whose element
/// type is closed under division. Integer arrays divide through
/// [`crate::IntegerArray::divide`] instead, which promotes to floating
/// point.
pub trait ArrayDiv<Rhs = Self>: Clone {
    /// Divide `self` by `rhs` in place, detaching from shared storage
    /// first.
    fn div_assign(&mut self, rhs: &Rhs) -> TesseraResult<()>;

    /// Divide a copy of `self` by `rhs`.
    fn div(&self, rhs: &Rhs) -> TesseraResult<Self> {
        let mut out = self.clone();
        out.div_assign(rhs)?;
        Ok(out)
    }
}
