use std::any::Any;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tessera_dtype::{DataType, DataTypeRef, TypeId};
use tessera_error::{TesseraResult, tessera_bail};
use tessera_scalar::Scalar;

use crate::{Array, ArrayRef, ArrayView, check_window};

/// The type of a dictionary-encoded array: a category kind parameterized by
/// its dictionary of category values.
///
/// Unlike the primitive types, category types are constructed per use; two
/// category types are equal only when they share the same dictionary window.
#[derive(Debug)]
pub struct CategoryType {
    categories: ArrayView,
}

impl CategoryType {
    /// A category type over the given dictionary.
    pub fn new(categories: ArrayView) -> Self {
        Self { categories }
    }

    /// The dictionary of category values.
    pub fn categories(&self) -> &ArrayView {
        &self.categories
    }
}

impl DataType for CategoryType {
    fn id(&self) -> TypeId {
        TypeId::Category
    }

    fn name(&self) -> &str {
        "category"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    /// Identity-based equality: two category types are equal only when
    /// they view the same dictionary array (pointer equality) over the
    /// same window. Equal dictionary contents in separate arrays compare
    /// unequal.
    fn equals(&self, other: &dyn DataType) -> bool {
        other.as_any().downcast_ref::<CategoryType>().is_some_and(|ct| {
            Arc::ptr_eq(ct.categories.array(), self.categories.array())
                && ct.categories.offset() == self.categories.offset()
                && ct.categories.len() == self.categories.len()
        })
    }
}

impl Display for CategoryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "category<{}>", self.categories.array().dtype())
    }
}

/// A dictionary-encoded array: integer codes indexing into a shared
/// dictionary of category values. A null code is a null element.
#[derive(Clone, Debug)]
pub struct CategoryArray {
    codes: ArrayView,
    ctype: Arc<CategoryType>,
    dtype: DataTypeRef,
}

impl CategoryArray {
    /// An array of `codes` into the `categories` dictionary.
    pub fn new(codes: ArrayView, categories: ArrayView) -> Self {
        let ctype = Arc::new(CategoryType::new(categories));
        let dtype: DataTypeRef = ctype.clone();
        Self {
            codes,
            ctype,
            dtype,
        }
    }

    fn with_codes(&self, codes: ArrayView) -> Self {
        Self {
            codes,
            ctype: self.ctype.clone(),
            dtype: self.dtype.clone(),
        }
    }

    /// The codes, one per element.
    pub fn codes(&self) -> &ArrayView {
        &self.codes
    }

    /// The array's category type.
    pub fn category_type(&self) -> &CategoryType {
        &self.ctype
    }

    /// The dictionary of category values.
    pub fn categories(&self) -> &ArrayView {
        self.ctype.categories()
    }
}

impl Array for CategoryArray {
    fn len(&self) -> usize {
        self.codes.len()
    }

    fn dtype(&self) -> &DataTypeRef {
        &self.dtype
    }

    fn null_count(&self) -> usize {
        self.codes.null_count()
    }

    fn get(&self, index: usize) -> TesseraResult<Scalar> {
        let code = self.codes.get(index)?;
        if code.is_null() {
            return Ok(Scalar::Null);
        }
        // An out-of-range code surfaces through the dictionary's own bounds
        // check.
        self.ctype.categories().get(code.as_usize()?)
    }

    fn set(&mut self, _index: usize, _value: Scalar) -> TesseraResult<()> {
        tessera_bail!(NotImplemented: "writing through a category array");
    }

    fn copy(&self, offset: usize, length: usize) -> TesseraResult<ArrayRef> {
        check_window(offset, length, self.codes.len())?;
        let codes = self
            .codes
            .array()
            .copy(self.codes.offset() + offset, length)?;
        Ok(Arc::new(self.with_codes(ArrayView::new(codes))))
    }

    fn owns_data(&self) -> bool {
        self.codes.ref_count() == 1 && self.codes.array().owns_data()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dictionary-encode integer codes against a dictionary array.
pub fn dictionary_encode(codes: ArrayRef, categories: ArrayRef) -> CategoryArray {
    CategoryArray::new(ArrayView::new(codes), ArrayView::new(categories))
}
