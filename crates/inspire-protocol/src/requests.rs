//! OGC KVP request builders for the Catastro WFS.

use catastro_common::crs::normalize_srs_to_urn;
use url::Url;

/// Stored query that returns one parcel by its 14-character reference.
pub const GET_PARCEL_STORED_QUERY: &str = "GetParcel";

/// Default feature type for unfiltered samples.
pub const CADASTRAL_PARCEL_TYPE: &str = "cp:CadastralParcel";

fn with_params(base: &Url, params: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().extend_pairs(params.iter().copied());
    url
}

/// `GetCapabilities` request.
pub fn get_capabilities(base: &Url, version: &str) -> Url {
    with_params(
        base,
        &[
            ("service", "WFS"),
            ("request", "GetCapabilities"),
            ("version", version),
        ],
    )
}

/// `DescribeFeatureType` request; its URL is also the base for resolving
/// relative `schemaLocation`s of the returned schema.
pub fn describe_feature_type(base: &Url, version: &str, type_name: &str) -> Url {
    with_params(
        base,
        &[
            ("service", "WFS"),
            ("request", "DescribeFeatureType"),
            ("version", version),
            ("typeName", type_name),
        ],
    )
}

/// `GetFeature` through the `GetParcel` stored query. The SRS is sent in URN
/// form, which the server honours more reliably than the short form.
pub fn get_parcel(base: &Url, version: &str, parcel_id: &str, srs: &str) -> Url {
    let srs_urn = normalize_srs_to_urn(srs);
    with_params(
        base,
        &[
            ("service", "WFS"),
            ("version", version),
            ("request", "GetFeature"),
            ("storedquery_id", GET_PARCEL_STORED_QUERY),
            ("refcat", parcel_id),
            ("srsName", srs_urn.as_str()),
        ],
    )
}

/// Unfiltered `GetFeature` limited to `count` features.
pub fn get_feature_sample(base: &Url, version: &str, type_name: &str, srs: &str, count: u32) -> Url {
    let srs_urn = normalize_srs_to_urn(srs);
    let count = count.to_string();
    with_params(
        base,
        &[
            ("service", "WFS"),
            ("version", version),
            ("request", "GetFeature"),
            ("typeNames", type_name),
            ("srsName", srs_urn.as_str()),
            ("count", count.as_str()),
        ],
    )
}
