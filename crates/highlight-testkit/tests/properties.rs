//! Property tests over generated salts, wallets and schemas.

use std::future::Future;

use highlight::HighlightError;
use highlight_core::eip712::{encode_type, type_hash};
use highlight_core::{primary_type, struct_dependencies};
use highlight_testkit::generators::{address, distinct_salts, salt, tree_schema, wallet};
use highlight_testkit::{TestFixture, TestWallet};
use proptest::prelude::*;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_ids_are_dense(salts in distinct_salts(5)) {
        let (ids, mci) = block_on(async {
            let fixture = TestFixture::new();
            let mut ids = Vec::new();
            for (n, salt) in salts.iter().enumerate() {
                let wallet = TestWallet::from_seed(salt.as_bytes());
                let alias = format!("0x{:040x}", n + 1);
                let envelope = fixture.set_alias(&wallet, &wallet.address(), &alias, salt);
                ids.push(fixture.highlight.post_message(envelope).await.unwrap().unit_id);
            }
            let mci = fixture.highlight.get_mci().await.unwrap();
            (ids, mci)
        });
        prop_assert_eq!(ids, (1..=5).collect::<Vec<u64>>());
        prop_assert_eq!(mci, 5);
    }

    #[test]
    fn test_salt_is_single_use(
        salt in salt(),
        first in wallet(),
        second in wallet(),
        alias_a in address(),
        alias_b in address(),
    ) {
        prop_assume!(alias_a != alias_b);
        let replay = block_on(async {
            let fixture = TestFixture::new();
            let envelope = fixture.set_alias(&first, &first.address(), &alias_a, &salt);
            fixture.highlight.post_message(envelope).await.unwrap();

            let envelope = fixture.set_alias(&second, &second.address(), &alias_b, &salt);
            fixture.highlight.post_message(envelope).await
        });
        prop_assert!(matches!(replay, Err(HighlightError::SaltAlreadyUsed)));
    }

    #[test]
    fn test_salt_case_is_not_a_new_salt(salt in salt(), owner in wallet()) {
        let replay = block_on(async {
            let fixture = TestFixture::new();
            let envelope = fixture.set_alias(&owner, &owner.address(), "0x00000000000000000000000000000000000000bb", &salt);
            fixture.highlight.post_message(envelope.clone()).await.unwrap();

            let mut respelled = envelope;
            respelled.domain.salt = Some(format!("0X{}", salt[2..].to_uppercase()).as_str().into());
            fixture.highlight.post_message(respelled).await
        });
        prop_assert!(matches!(replay, Err(HighlightError::SaltAlreadyUsed)));
    }

    #[test]
    fn test_signer_must_match_from(salt in salt(), signer in wallet(), owner in wallet()) {
        prop_assume!(signer.address() != owner.address());
        let (result, mci) = block_on(async {
            let fixture = TestFixture::new();
            let envelope = fixture.set_alias(&signer, &owner.address(), "0x00000000000000000000000000000000000000bb", &salt);
            let result = fixture.highlight.post_message(envelope).await;
            (result, fixture.highlight.get_mci().await.unwrap())
        });
        prop_assert_eq!(result.unwrap_err().to_string(), "Invalid signer");
        prop_assert_eq!(mci, 0);
    }
}

proptest! {
    #[test]
    fn test_tree_root_is_primary(types in tree_schema(6)) {
        prop_assert_eq!(primary_type(&types).unwrap(), "T0");
    }

    #[test]
    fn test_encode_type_lists_every_dependency(types in tree_schema(6)) {
        let encoded = encode_type("T0", &types).unwrap();
        prop_assert!(encoded.starts_with("T0("));

        let deps = struct_dependencies("T0", &types);
        prop_assert_eq!(deps.len(), types.len() - 1);
        // Dependencies follow the primary type in name order.
        let mut cursor = 0;
        for name in deps {
            let needle = format!("){name}(");
            let at = encoded[cursor..].find(&needle);
            prop_assert!(at.is_some(), "{} missing after offset {}", name, cursor);
            cursor += at.unwrap_or_default() + 1;
        }
    }

    #[test]
    fn test_type_hash_is_stable(types in tree_schema(4)) {
        prop_assert_eq!(type_hash("T0", &types).unwrap(), type_hash("T0", &types).unwrap());
    }
}
