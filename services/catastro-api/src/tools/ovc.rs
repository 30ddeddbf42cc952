//! OVC lookup tools (callejero and coordenadas services).

use catastro_common::{CadastralReference, CatastroResult};
use ovc_protocol::{parse_response, AddressQuery, OvcQuery, OvcResult, PropertyLookup};
use tracing::debug;

use super::{Address, ToolOutput};
use crate::state::AppState;

/// Send one OVC query and map its payload.
pub async fn call(state: &AppState, query: OvcQuery) -> CatastroResult<OvcResult> {
    let service = query.endpoint.service();
    let url = query.url(state.endpoints.ovc_root(service));
    let value = state.upstream.get_json(service.as_str(), url).await?;
    let result = parse_response(query.endpoint, &value)?;
    debug!(
        endpoint = query.endpoint.path(),
        items = result.len().unwrap_or(0),
        "OVC response mapped"
    );
    Ok(result)
}

/// Apply the local name filter on top of whatever the upstream matched.
fn filtered(mut result: OvcResult, filter: Option<&str>) -> OvcResult {
    if let Some(filter) = filter {
        result.retain_names(filter);
    }
    result
}

pub async fn list_provinces(state: &AppState) -> CatastroResult<ToolOutput> {
    Ok(ToolOutput::Ovc(call(state, OvcQuery::provinces()).await?))
}

pub async fn list_municipalities(
    state: &AppState,
    province: &str,
    filter: Option<&str>,
) -> CatastroResult<ToolOutput> {
    let result = call(state, OvcQuery::municipalities(province, filter)).await?;
    Ok(ToolOutput::Ovc(filtered(result, filter)))
}

pub async fn list_streets(
    state: &AppState,
    province: &str,
    municipality: &str,
    filter: Option<&str>,
    street_type: Option<&str>,
) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::streets(province, municipality, street_type, filter);
    let result = call(state, query).await?;
    Ok(ToolOutput::Ovc(filtered(result, filter)))
}

pub async fn list_numbers(
    state: &AppState,
    province: &str,
    municipality: &str,
    street_type: &str,
    street: &str,
    number: &str,
) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::numbers(province, municipality, street_type, street, number);
    Ok(ToolOutput::Ovc(call(state, query).await?))
}

pub async fn property_by_address(state: &AppState, address: &Address) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::property_by_address(&AddressQuery {
        province: &address.province,
        municipality: &address.municipality,
        street_type: &address.street_type,
        street: &address.street,
        number: &address.number,
        block: address.block.as_deref(),
        stair: address.stair.as_deref(),
        floor: address.floor.as_deref(),
        door: address.door.as_deref(),
    });
    Ok(ToolOutput::Ovc(call(state, query).await?))
}

/// A 14-character reference fans out to every unit of the parcel; an
/// 18/20-character one resolves to a single unit.
pub async fn property_by_reference(
    state: &AppState,
    reference: &CadastralReference,
    province: Option<&str>,
    municipality: Option<&str>,
) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::property_by_reference(reference.raw(), province, municipality);
    match call(state, query).await? {
        OvcResult::Properties { items } => {
            let lookup = PropertyLookup::from_records(reference, items)?;
            Ok(ToolOutput::Property(lookup))
        }
        other => Ok(ToolOutput::Ovc(other)),
    }
}

pub async fn property_by_polygon_parcel(
    state: &AppState,
    province: &str,
    municipality: &str,
    polygon: &str,
    parcel: &str,
) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::property_by_polygon_parcel(province, municipality, polygon, parcel);
    Ok(ToolOutput::Ovc(call(state, query).await?))
}

/// The coordinates service only knows parcels, so the unit suffix is dropped.
pub async fn reference_to_coordinates(
    state: &AppState,
    reference: &CadastralReference,
    srs: &str,
    province: Option<&str>,
    municipality: Option<&str>,
) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::reference_to_coordinates(reference.parcel_id(), srs, province, municipality);
    Ok(ToolOutput::Ovc(call(state, query).await?))
}

pub async fn coordinates_to_reference(state: &AppState, x: f64, y: f64, srs: &str) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::coordinates_to_reference(x, y, srs);
    Ok(ToolOutput::Ovc(call(state, query).await?))
}

pub async fn nearby_references(state: &AppState, x: f64, y: f64, srs: &str) -> CatastroResult<ToolOutput> {
    let query = OvcQuery::nearby_references(x, y, srs);
    Ok(ToolOutput::Ovc(call(state, query).await?))
}
