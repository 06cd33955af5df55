use std::{fs, time::Duration};

use anyhow::Result;
use psbt_analyzer::{
    config::Config,
    fees::{Client, Error, FeeEstimator, FeeRates, FixedFees, read_api_key},
};
use tempfile::TempDir;

#[tokio::test]
async fn test_read_api_key() -> Result<()> {
    let dir = TempDir::new()?;

    let missing = dir.path().join("missing");
    assert!(matches!(read_api_key(&missing), Err(Error::MissingApiKey(_))));

    let empty = dir.path().join("empty");
    fs::write(&empty, " \n")?;
    assert!(matches!(read_api_key(&empty), Err(Error::EmptyApiKey(_))));

    let key = dir.path().join("local-secrets");
    fs::write(&key, "  secret-token\n")?;
    assert_eq!(read_api_key(&key)?, "secret-token");
    Ok(())
}

#[tokio::test]
async fn test_client_from_config_requires_key_file() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = Config::new_offline();
    config.fee_api_key_path = dir.path().join("absent");
    assert!(matches!(
        Client::new_from_config(&config),
        Err(Error::MissingApiKey(_))
    ));

    fs::write(&config.fee_api_key_path, "token")?;
    assert!(Client::new_from_config(&config).is_ok());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_back() -> Result<()> {
    let client = Client::new(
        "http://127.0.0.1:9/api/v1/fees/recommended".to_string(),
        "token".to_string(),
        Duration::from_millis(500),
    )?;
    assert!(client.get_recommended_fees().await.is_err());
    assert_eq!(client.recommended_fees().await, FeeRates::FALLBACK);
    Ok(())
}

#[tokio::test]
async fn test_fixed_fees() -> Result<()> {
    let rates = FeeRates {
        fastest_fee: 12,
        half_hour_fee: 8,
        hour_fee: 6,
        economy_fee: 3,
        minimum_fee: 1,
    };
    assert_eq!(FixedFees(rates).recommended_fees().await, rates);
    assert_eq!(
        FixedFees::default().recommended_fees().await,
        FeeRates::FALLBACK
    );
    Ok(())
}

#[tokio::test]
async fn test_fee_rates_parse_endpoint_json() -> Result<()> {
    let body = r#"{"fastestFee":21,"halfHourFee":15,"hourFee":11,"economyFee":4,"minimumFee":2}"#;
    let rates: FeeRates = serde_json::from_str(body)?;
    assert_eq!(
        rates,
        FeeRates {
            fastest_fee: 21,
            half_hour_fee: 15,
            hour_fee: 11,
            economy_fee: 4,
            minimum_fee: 2,
        }
    );
    Ok(())
}
