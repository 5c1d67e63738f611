use crate::ErrorLocation;

use std::panic::Location;

#[test]
#[track_caller]
fn given_caller_location_when_formatted_then_shows_file_line_and_column() {
    // GIVEN: A location captured from this test
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Displaying it
    let formatted = location.to_string();

    // THEN: Bracketed file:line:column
    assert!(formatted.starts_with('['));
    assert!(formatted.ends_with(']'));
    assert!(formatted.contains(location.file));
    assert!(formatted.contains(&format!(":{}:{}", location.line, location.column)));
}
