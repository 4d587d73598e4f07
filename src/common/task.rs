use chrono::Local;

/// Date-based task id, e.g. `20250314-093012-7f3a`.
pub fn new_task_id() -> String {
    let suffix: u16 = rand::random();
    format!("{}-{:04x}", Local::now().format("%Y%m%d-%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn task_ids_are_date_prefixed() {
        let re = Regex::new(r"^\d{8}-\d{6}-[0-9a-f]{4}$").unwrap();
        let id = new_task_id();
        assert!(re.is_match(&id), "unexpected task id {id}");
    }
}
