use anyhow::Result;
use bitcoin::{Amount, Network};
use psbt_analyzer::{
    analyzer::{self, AnalysisResult, FeeAssessment},
    edit::{
        ASSUMED_CHANGE_REASON, Edit, EditError, INSUFFICIENT_FUNDS_SUGGESTION,
        UNRESOLVED_ADDRESS, apply_edits,
    },
    fees::{FeeRates, FixedFees},
    script::ScriptType,
    test_utils::{UtxoSpec, build_psbt, p2wpkh_script, to_base64, txout},
};

fn fallback() -> FixedFees {
    FixedFees(FeeRates::FALLBACK)
}

/// 100,000 sat p2wpkh input paying 50,000 with 49,500 change.
async fn base_analysis() -> Result<AnalysisResult> {
    let psbt = build_psbt(
        vec![UtxoSpec::witness(100_000, p2wpkh_script(1))],
        vec![
            txout(50_000, p2wpkh_script(2)),
            txout(49_500, p2wpkh_script(3)),
        ],
    );
    Ok(analyzer::analyze_base64(&to_base64(&psbt), Network::Bitcoin, &fallback()).await?)
}

fn parse(edits: &[&str]) -> Result<Vec<Edit>> {
    Ok(edits
        .iter()
        .map(|e| e.parse::<Edit>())
        .collect::<Result<Vec<_>, _>>()?)
}

#[tokio::test]
async fn test_no_edits_rebalances_change_at_hour_rate() -> Result<()> {
    let analysis = base_analysis().await?;
    let edited = apply_edits(&analysis, &[], &fallback()).await?;

    // 142 vB at the 20 sat/vB hour rate.
    assert_eq!(edited.estimated_vsize, 142);
    assert_eq!(edited.inferred_fee, 2_840);
    assert_eq!(edited.inferred_fee_rate, 20.0);
    assert_eq!(edited.outputs[1].amount, 47_160);
    let change = edited.change_output.as_ref().unwrap();
    assert_eq!(change.index, 1);
    assert_eq!(change.reason, ASSUMED_CHANGE_REASON);
    assert_eq!(edited.fee_assessment, FeeAssessment::Low);

    // Totals come from summing the edited lists, which are unchanged here.
    assert_eq!(edited.total_input_value, analysis.total_input_value);
    assert_eq!(edited.total_output_value, analysis.total_output_value);

    // The analysis passed in is left alone.
    assert_eq!(analysis.outputs[1].amount, 49_500);
    assert_eq!(analysis.inferred_fee, 500);
    Ok(())
}

#[tokio::test]
async fn test_add_input_grows_change() -> Result<()> {
    let analysis = base_analysis().await?;
    let edits = parse(&["add-input 20000 witness_v1_taproot"])?;
    let edited = apply_edits(&analysis, &edits, &fallback()).await?;

    let added = &edited.inputs[1];
    assert_eq!(added.amount, 20_000);
    assert_eq!(added.script_type, ScriptType::WitnessV1Taproot);
    assert_eq!(added.address, UNRESOLVED_ADDRESS);
    assert_eq!(added.address_type, "p2tr");
    assert_eq!(added.estimated_input_vbytes, 58);

    // 10 + 1 + 1 + 68 + 58 + 31 + 31 = 200 vB, fee 4,000.
    assert_eq!(edited.estimated_vsize, 200);
    assert_eq!(edited.inferred_fee, 4_000);
    assert_eq!(edited.outputs[1].amount, 120_000 - 50_000 - 4_000);
    assert!(edited.script_summary.starts_with("Taproot"));
    Ok(())
}

#[tokio::test]
async fn test_dust_change_is_dropped() -> Result<()> {
    let analysis = base_analysis().await?;
    let edited = apply_edits(
        &analysis,
        &[Edit::SetOutputAmount {
            index: 0,
            amount: 97_000,
        }],
        &fallback(),
    )
    .await?;

    // With change: 97,000 + 2,840 + 546 > 100,000. Without: 111 vB, 2,220 sat suffices.
    assert_eq!(edited.outputs.len(), 1);
    assert_eq!(edited.outputs[0].amount, 97_000);
    // Summed before the change output was dropped.
    assert_eq!(edited.total_output_value, 97_000 + 49_500);
    assert_eq!(edited.estimated_vsize, 111);
    assert_eq!(edited.inferred_fee, 3_000);
    assert!((edited.inferred_fee_rate - 3_000.0 / 111.0).abs() < 1e-9);
    assert!(!edited.fee_invalid);
    assert_eq!(edited.change_output, None);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_marks_fee_invalid() -> Result<()> {
    let analysis = base_analysis().await?;
    let edits = parse(&["set-output-amount 0 99000"])?;
    let edited = apply_edits(&analysis, &edits, &fallback()).await?;

    assert!(edited.fee_invalid);
    assert_eq!(edited.fee_assessment, FeeAssessment::Invalid);
    assert_eq!(
        edited.fee_reasonableness_suggestion,
        INSUFFICIENT_FUNDS_SUGGESTION
    );
    assert_eq!(edited.inferred_fee, 1_000);
    assert_eq!(edited.inferred_fee_rate, 0.0);
    assert_eq!(edited.outputs.len(), 2);
    assert_eq!(edited.outputs[1].amount, 49_500);
    assert_eq!(edited.change_output, None);
    Ok(())
}

#[tokio::test]
async fn test_single_output_uses_plain_fee() -> Result<()> {
    let analysis = base_analysis().await?;
    let edited = apply_edits(&analysis, &[Edit::RemoveOutput { index: 1 }], &fallback()).await?;

    assert_eq!(edited.outputs.len(), 1);
    assert_eq!(edited.inferred_fee, 50_000);
    assert_eq!(edited.estimated_vsize, 111);
    assert_eq!(edited.fee_assessment, FeeAssessment::VeryHigh);
    assert_eq!(edited.change_output, None);

    let overspent =
        apply_edits(&analysis, &parse(&["remove-input 0"])?, &fallback()).await?;
    assert!(overspent.inputs.is_empty());
    assert!(overspent.fee_invalid);
    Ok(())
}

#[tokio::test]
async fn test_edits_apply_in_order() -> Result<()> {
    let analysis = base_analysis().await?;
    let edits = parse(&[
        "add-output 10000 pubkeyhash",
        "remove-output 0",
        "set-output-amount 0 30000",
    ])?;
    let edited = apply_edits(&analysis, &edits, &fallback()).await?;

    // Outputs are now [30,000 p2wpkh, 10,000 p2pkh]; the p2pkh one is treated as change.
    assert_eq!(edited.outputs.len(), 2);
    assert_eq!(edited.outputs[0].amount, 30_000);
    assert_eq!(edited.outputs[1].script_type, ScriptType::PubkeyHash);
    assert_eq!(edited.outputs[1].estimated_output_vbytes, 34);
    // 10 + 1 + 1 + 68 + 31 + 34 = 145 vB, fee 2,900.
    assert_eq!(edited.inferred_fee, 2_900);
    assert_eq!(edited.outputs[1].amount, 100_000 - 30_000 - 2_900);
    Ok(())
}

#[tokio::test]
async fn test_bad_index_leaves_nothing_half_applied() -> Result<()> {
    let analysis = base_analysis().await?;

    let err = apply_edits(&analysis, &parse(&["remove-input 3"])?, &fallback())
        .await
        .unwrap_err();
    assert_eq!(err, EditError::InputIndexOutOfRange { index: 3, len: 1 });

    let err = apply_edits(
        &analysis,
        &parse(&["add-output 1000 scripthash", "set-output-amount 5 1"])?,
        &fallback(),
    )
    .await
    .unwrap_err();
    assert_eq!(err, EditError::OutputIndexOutOfRange { index: 5, len: 3 });
    assert_eq!(analysis.outputs.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_empty_edits_keep_totals() -> Result<()> {
    let analysis = base_analysis().await?;
    for fees in [
        fallback(),
        FixedFees(FeeRates {
            hour_fee: 1,
            ..FeeRates::FALLBACK
        }),
        FixedFees(FeeRates {
            hour_fee: 1_000,
            ..FeeRates::FALLBACK
        }),
    ] {
        let edited = apply_edits(&analysis, &[], &fees).await?;
        assert_eq!(edited.total_input_value, 100_000);
        assert_eq!(edited.total_output_value, 99_500);
    }
    Ok(())
}

#[tokio::test]
async fn test_amounts_above_supply_are_rejected() -> Result<()> {
    let analysis = base_analysis().await?;

    let err = "set-output-amount 0 18446744073709551615"
        .parse::<Edit>()
        .unwrap_err();
    assert_eq!(err, EditError::AmountOutOfRange { amount: u64::MAX });

    let too_much = Amount::MAX_MONEY.to_sat() + 1;
    for edit in [
        Edit::SetOutputAmount {
            index: 0,
            amount: u64::MAX,
        },
        Edit::AddInput {
            amount: too_much,
            script_type: ScriptType::WitnessV0KeyHash,
        },
        Edit::AddOutput {
            amount: too_much,
            script_type: ScriptType::WitnessV0KeyHash,
        },
    ] {
        let err = apply_edits(&analysis, &[edit], &fallback()).await.unwrap_err();
        assert!(matches!(err, EditError::AmountOutOfRange { .. }));
    }
    Ok(())
}

#[tokio::test]
async fn test_many_large_inputs_do_not_overflow() -> Result<()> {
    let analysis = base_analysis().await?;
    let edits = vec![
        Edit::AddInput {
            amount: Amount::MAX_MONEY.to_sat(),
            script_type: ScriptType::WitnessV0KeyHash,
        };
        9_000
    ];
    let edited = apply_edits(&analysis, &edits, &fallback()).await?;

    assert_eq!(edited.total_input_value, u64::MAX);
    assert!(!edited.fee_invalid);
    assert_eq!(edited.change_output.as_ref().unwrap().index, 1);
    Ok(())
}

fn one_sat_outputs(count: usize) -> Vec<Edit> {
    vec![
        Edit::AddOutput {
            amount: 1,
            script_type: ScriptType::WitnessV0KeyHash,
        };
        count
    ]
}

#[tokio::test]
async fn test_dropping_253rd_output_narrows_count_varint() -> Result<()> {
    let analysis = base_analysis().await?;
    let one_sat_per_vbyte = FixedFees(FeeRates {
        hour_fee: 1,
        ..FeeRates::FALLBACK
    });

    // 253 outputs: 10 + 1 + 3 + 68 + 253 * 31 = 7,925 vB. Without the last one the count
    // varint shrinks too: 7,925 - 31 - 2 = 7,892 vB.
    // Target is 42,358 + 49,500 + 250 = 92,108, leaving exactly 7,892 sat for the fee.
    let mut edits = vec![Edit::SetOutputAmount {
        index: 0,
        amount: 42_358,
    }];
    edits.extend(one_sat_outputs(251));
    let edited = apply_edits(&analysis, &edits, &one_sat_per_vbyte).await?;

    assert_eq!(edited.outputs.len(), 252);
    assert_eq!(edited.estimated_vsize, 7_892);
    assert_eq!(edited.inferred_fee, 7_892);
    assert!(!edited.fee_invalid);
    assert_eq!(edited.change_output, None);
    Ok(())
}

#[tokio::test]
async fn test_dropping_254th_output_keeps_count_varint() -> Result<()> {
    let analysis = base_analysis().await?;
    let one_sat_per_vbyte = FixedFees(FeeRates {
        hour_fee: 1,
        ..FeeRates::FALLBACK
    });

    // 254 outputs: 10 + 1 + 3 + 68 + 254 * 31 = 7,956 vB. 253 remain after the drop, so the
    // varint stays 3 bytes: 7,956 - 31 = 7,925 vB.
    // Target is 42,324 + 49,500 + 251 = 92,075, leaving exactly 7,925 sat for the fee.
    let mut edits = vec![Edit::SetOutputAmount {
        index: 0,
        amount: 42_324,
    }];
    edits.extend(one_sat_outputs(252));
    let edited = apply_edits(&analysis, &edits, &one_sat_per_vbyte).await?;

    assert_eq!(edited.outputs.len(), 253);
    assert_eq!(edited.estimated_vsize, 7_925);
    assert_eq!(edited.inferred_fee, 7_925);
    assert!(!edited.fee_invalid);
    Ok(())
}
