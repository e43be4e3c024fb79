//! Classification of commands and arguments as requiring confirmation.
//!
//! Returns `None` if a `(command, args)` pair is safe, otherwise a
//! human-readable reason that is surfaced to the user and the audit log.
//! This is a pure function of the policy and the call: it never touches
//! the filesystem or spawns anything.

use crate::policy::Policy;

pub fn classify(policy: &Policy, command: &str, args: &[String]) -> Option<String> {
    if policy.dangerous_commands.contains(command) {
        return Some(format!("'{command}' is always classified as dangerous"));
    }

    for rule in &policy.dangerous_patterns {
        if rule.command != command {
            continue;
        }

        if args.iter().any(|a| rule.args_any_of.contains(a)) {
            return Some(format!(
                "'{command}' invoked with an argument matching a dangerous pattern"
            ));
        }

        if rule
            .args_regex_any_of
            .iter()
            .any(|re| args.iter().any(|a| re.is_match(a)))
        {
            return Some(format!(
                "'{command}' invoked with an argument matching a dangerous pattern"
            ));
        }
    }

    None
}
