use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;

/// Generate an invitation token of `length` alphanumeric characters from
/// the operating system's CSPRNG.
pub fn generate_invitation_token(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
