use move_e::e_command_builder::{Action, AptosCommandBuilder, Network};
use std::path::Path;
use std::time::Duration;

#[test]
fn integration_test_builder() {
    let spec = AptosCommandBuilder::new("aptos", "/work/hello")
        .with_timeout(Duration::from_secs(42))
        .with_action(&Action::Publish, Some(Path::new("/work/hello")))
        .with_extra_args(&["--assume-yes".to_string()])
        .build();

    assert_eq!(spec.args.first().map(String::as_str), Some("move"));
    assert!(spec.args.contains(&"publish".to_string()));
    assert_eq!(spec.args.last().map(String::as_str), Some("--assume-yes"));
    assert_eq!(spec.timeout, Duration::from_secs(42));
}

#[test]
fn init_uses_profile_and_optional_network() {
    let spec = AptosCommandBuilder::new("aptos", ".")
        .with_profile("ci")
        .with_action(
            &Action::Init {
                network: Some(Network::Mainnet),
            },
            None,
        )
        .build();
    assert_eq!(
        spec.display_line(),
        "aptos init --profile ci --network mainnet"
    );
}
