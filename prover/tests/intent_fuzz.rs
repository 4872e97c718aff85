use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, U256};
use privacy_prover::intent::{intent_preimage, SELECTOR_LEN};
use proptest::prelude::*;

fn abi() -> JsonAbi {
    JsonAbi::parse([
        "function redeem((uint256[2],uint256[2][2],uint256[2],uint256[3]) ownership, uint256 tokenId, address recipient)",
        "function redeemWithCredit((uint256[2],uint256[2][2],uint256[2],uint256[3]) ownership, (uint256[2],uint256[2][2],uint256[2],uint256[5]) creditNote, uint256 tokenId, address recipient)",
    ])
    .expect("abi")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn stripped_preimage_is_selector_and_plain_arguments(
        token in any::<[u8; 32]>(),
        recipient in any::<[u8; 20]>(),
        with_credit_note in any::<bool>(),
    ) {
        let abi = abi();
        let function = if with_credit_note { "redeemWithCredit" } else { "redeem" };
        let args = vec![
            DynSolValue::Uint(U256::from_be_bytes(token), 256),
            DynSolValue::Address(Address::from(recipient)),
        ];
        let preimage = intent_preimage(&abi, function, &args, with_credit_note).expect("preimage");
        let selector = abi.function(function).expect("function")[0].selector();
        prop_assert_eq!(&preimage[..SELECTOR_LEN], selector.as_slice());
        let expected_params = DynSolValue::Tuple(args).abi_encode_params();
        prop_assert_eq!(
            &preimage[SELECTOR_LEN..],
            expected_params.as_slice()
        );
    }
}
