/// Represents a field update operation for partial updates
///
/// This type provides a clear, three-state pattern for updating optional fields:
/// - `NoChange`: Field keeps its existing value
/// - `Set(value)`: Field is updated to the provided value
/// - `Clear`: Field is cleared (set to None)
///
/// # Example
///
/// ```
/// use grc_domain::FieldUpdate;
///
/// let description_update = FieldUpdate::Set("Collect evidence".to_string());
/// let start_date_update: FieldUpdate<chrono::NaiveDate> = FieldUpdate::Clear;
/// let notes_update: FieldUpdate<String> = FieldUpdate::NoChange;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Do not modify this field (keep existing value)
    NoChange,
    /// Set the field to the provided value
    Set(T),
    /// Clear the field (set to None)
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::NoChange
    }
}

impl<T> FieldUpdate<T> {
    /// Apply this update to an optional field
    ///
    /// # Example
    ///
    /// ```
    /// use grc_domain::FieldUpdate;
    ///
    /// let mut description = Some("Draft".to_string());
    /// FieldUpdate::Set("Final".to_string()).apply_to(&mut description);
    /// assert_eq!(description, Some("Final".to_string()));
    ///
    /// FieldUpdate::Clear.apply_to(&mut description);
    /// assert_eq!(description, None);
    /// ```
    pub fn apply_to(self, field: &mut Option<T>) {
        match self {
            FieldUpdate::NoChange => {}
            FieldUpdate::Set(value) => *field = Some(value),
            FieldUpdate::Clear => *field = None,
        }
    }

    /// Check if this represents a change (not NoChange)
    pub fn is_change(&self) -> bool {
        !matches!(self, FieldUpdate::NoChange)
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// Convert Option<T> to FieldUpdate<T>
    /// - Some(value) becomes Set(value)
    /// - None becomes Clear
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_change_keeps_value() {
        let mut field = Some(3);
        FieldUpdate::NoChange.apply_to(&mut field);
        assert_eq!(field, Some(3));
        assert!(!FieldUpdate::<i32>::NoChange.is_change());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(FieldUpdate::from(Some(1)), FieldUpdate::Set(1));
        assert_eq!(FieldUpdate::<i32>::from(None), FieldUpdate::Clear);
    }
}
