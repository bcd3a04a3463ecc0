/// Returns the lesson count with the correct English word form.
///
/// # Example
///
/// ```
/// use abonbot::utils::lessons_phrase;
///
/// assert_eq!(lessons_phrase(1), "1 lesson");
/// assert_eq!(lessons_phrase(4), "4 lessons");
/// ```
pub fn lessons_phrase(n: i64) -> String {
    if n == 1 {
        "1 lesson".to_string()
    } else {
        format!("{} lessons", n)
    }
}
