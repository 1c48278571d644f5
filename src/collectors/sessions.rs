use crate::collectors::run_checked;
use crate::report::UserSessions;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

pub async fn logged_in_users(timeout: Duration) -> Option<Vec<UserSessions>> {
    match run_checked("who", &[], timeout).await {
        Ok(stdout) => Some(parse_who(&stdout)),
        Err(err) => {
            debug!(collector = "users", error = %err, "who failed");
            None
        }
    }
}

/// Counts sessions per user from `who` output, ordered by user name.
pub fn parse_who(output: &str) -> Vec<UserSessions> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for user in output.lines().filter_map(|l| l.split_whitespace().next()) {
        *counts.entry(user).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(user, sessions)| UserSessions {
            user: user.to_string(),
            sessions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sessions_per_user() {
        let out = "\
root     tty1         2026-10-17 08:00
bob      pts/1        2026-10-17 09:30 (10.0.0.9)
alice    pts/0        2026-10-17 09:12 (10.0.0.5)
bob      pts/2        2026-10-17 09:31 (10.0.0.9)

";
        let users = parse_who(out);
        assert_eq!(
            users,
            vec![
                UserSessions { user: "alice".to_string(), sessions: 1 },
                UserSessions { user: "bob".to_string(), sessions: 2 },
                UserSessions { user: "root".to_string(), sessions: 1 },
            ]
        );
    }

    #[test]
    fn no_sessions_is_empty() {
        assert!(parse_who("").is_empty());
    }
}
