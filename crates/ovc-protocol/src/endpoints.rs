//! OVC endpoints and query builders.

use serde::Serialize;
use url::Url;

/// The two OVC JSON service roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OvcService {
    /// `COVCCallejero.svc/json`: street directory and property data.
    Callejero,
    /// `COVCCoordenadas.svc/json`: reference ↔ coordinate conversion.
    Coordenadas,
}

impl OvcService {
    pub fn as_str(&self) -> &'static str {
        match self {
            OvcService::Callejero => "callejero",
            OvcService::Coordenadas => "coordenadas",
        }
    }
}

/// OVC operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OvcEndpoint {
    Provinces,
    Municipalities,
    Streets,
    Numbers,
    PropertyByAddress,
    PropertyByReference,
    PropertyByPolygonParcel,
    ReferenceToCoordinates,
    CoordinatesToReference,
    NearbyReferences,
}

impl OvcEndpoint {
    /// Operation path appended to the service root.
    pub fn path(&self) -> &'static str {
        match self {
            OvcEndpoint::Provinces => "ObtenerProvincias",
            OvcEndpoint::Municipalities => "ObtenerMunicipios",
            OvcEndpoint::Streets => "ObtenerCallejero",
            OvcEndpoint::Numbers => "ObtenerNumerero",
            OvcEndpoint::PropertyByAddress => "Consulta_DNPLOC",
            OvcEndpoint::PropertyByReference => "Consulta_DNPRC",
            OvcEndpoint::PropertyByPolygonParcel => "Consulta_DNPPP",
            OvcEndpoint::ReferenceToCoordinates => "Consulta_CPMRC",
            OvcEndpoint::CoordinatesToReference => "Consulta_RCCOOR",
            OvcEndpoint::NearbyReferences => "Consulta_RCCOOR_Distancia",
        }
    }

    pub fn service(&self) -> OvcService {
        match self {
            OvcEndpoint::ReferenceToCoordinates
            | OvcEndpoint::CoordinatesToReference
            | OvcEndpoint::NearbyReferences => OvcService::Coordenadas,
            _ => OvcService::Callejero,
        }
    }
}

/// A fully parameterised OVC request.
///
/// Optional parameters the caller leaves out are still sent, empty: the OVC
/// services expect the full parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct OvcQuery {
    pub endpoint: OvcEndpoint,
    pub params: Vec<(&'static str, String)>,
}

fn opt(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

impl OvcQuery {
    fn new(endpoint: OvcEndpoint, params: Vec<(&'static str, String)>) -> Self {
        Self { endpoint, params }
    }

    pub fn provinces() -> Self {
        Self::new(OvcEndpoint::Provinces, Vec::new())
    }

    pub fn municipalities(province: &str, filter: Option<&str>) -> Self {
        Self::new(
            OvcEndpoint::Municipalities,
            vec![("Provincia", province.to_string()), ("Municipio", opt(filter))],
        )
    }

    pub fn streets(province: &str, municipality: &str, street_type: Option<&str>, filter: Option<&str>) -> Self {
        Self::new(
            OvcEndpoint::Streets,
            vec![
                ("Provincia", province.to_string()),
                ("Municipio", municipality.to_string()),
                ("TipoVia", opt(street_type)),
                ("NomVia", opt(filter)),
            ],
        )
    }

    pub fn numbers(province: &str, municipality: &str, street_type: &str, street: &str, number: &str) -> Self {
        Self::new(
            OvcEndpoint::Numbers,
            vec![
                ("Provincia", province.to_string()),
                ("Municipio", municipality.to_string()),
                ("TipoVia", street_type.to_string()),
                ("NomVia", street.to_string()),
                ("Numero", number.to_string()),
            ],
        )
    }

    pub fn property_by_address(address: &AddressQuery<'_>) -> Self {
        Self::new(
            OvcEndpoint::PropertyByAddress,
            vec![
                ("Provincia", address.province.to_string()),
                ("Municipio", address.municipality.to_string()),
                ("Sigla", address.street_type.to_string()),
                ("Calle", address.street.to_string()),
                ("Numero", address.number.to_string()),
                ("Bloque", opt(address.block)),
                ("Escalera", opt(address.stair)),
                ("Planta", opt(address.floor)),
                ("Puerta", opt(address.door)),
            ],
        )
    }

    pub fn property_by_reference(reference: &str, province: Option<&str>, municipality: Option<&str>) -> Self {
        Self::new(
            OvcEndpoint::PropertyByReference,
            vec![
                ("Provincia", opt(province)),
                ("Municipio", opt(municipality)),
                ("RefCat", reference.to_string()),
            ],
        )
    }

    pub fn property_by_polygon_parcel(province: &str, municipality: &str, polygon: &str, parcel: &str) -> Self {
        Self::new(
            OvcEndpoint::PropertyByPolygonParcel,
            vec![
                ("Provincia", province.to_string()),
                ("Municipio", municipality.to_string()),
                ("Poligono", polygon.to_string()),
                ("Parcela", parcel.to_string()),
            ],
        )
    }

    pub fn reference_to_coordinates(
        reference: &str,
        srs: &str,
        province: Option<&str>,
        municipality: Option<&str>,
    ) -> Self {
        Self::new(
            OvcEndpoint::ReferenceToCoordinates,
            vec![
                ("Provincia", opt(province)),
                ("Municipio", opt(municipality)),
                ("SRS", srs.to_string()),
                ("RefCat", reference.to_string()),
            ],
        )
    }

    pub fn coordinates_to_reference(x: f64, y: f64, srs: &str) -> Self {
        Self::new(OvcEndpoint::CoordinatesToReference, coordinate_params(x, y, srs))
    }

    pub fn nearby_references(x: f64, y: f64, srs: &str) -> Self {
        Self::new(OvcEndpoint::NearbyReferences, coordinate_params(x, y, srs))
    }

    /// Request URL under the given service root.
    pub fn url(&self, service_root: &Url) -> Url {
        let mut url = service_root.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(self.endpoint.path());
        }
        if !self.params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }
}

fn coordinate_params(x: f64, y: f64, srs: &str) -> Vec<(&'static str, String)> {
    vec![
        ("CoorX", x.to_string()),
        ("CoorY", y.to_string()),
        ("SRS", srs.to_string()),
    ]
}

/// Postal address for `Consulta_DNPLOC`.
#[derive(Debug, Clone, Default)]
pub struct AddressQuery<'a> {
    pub province: &'a str,
    pub municipality: &'a str,
    /// Street type abbreviation (`CL`, `AV`, `PZ`, ...).
    pub street_type: &'a str,
    pub street: &'a str,
    pub number: &'a str,
    pub block: Option<&'a str>,
    pub stair: Option<&'a str>,
    pub floor: Option<&'a str>,
    pub door: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn callejero() -> Url {
        Url::parse("https://ovc.catastro.meh.es/OVCServWeb/OVCWcfCallejero/COVCCallejero.svc/json").unwrap()
    }

    #[test]
    fn test_url_appends_operation() {
        let url = OvcQuery::provinces().url(&callejero());
        assert_eq!(
            url.as_str(),
            "https://ovc.catastro.meh.es/OVCServWeb/OVCWcfCallejero/COVCCallejero.svc/json/ObtenerProvincias"
        );
    }

    #[test]
    fn test_trailing_slash_root() {
        let root = Url::parse("http://127.0.0.1:9000/callejero/").unwrap();
        let url = OvcQuery::provinces().url(&root);
        assert_eq!(url.path(), "/callejero/ObtenerProvincias");
    }

    #[test]
    fn test_optional_params_sent_empty() {
        let url = OvcQuery::municipalities("MADRID", None).url(&callejero());
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["Provincia"], "MADRID");
        assert_eq!(params["Municipio"], "");
    }

    #[test]
    fn test_address_params() {
        let address = AddressQuery {
            province: "MADRID",
            municipality: "MADRID",
            street_type: "CL",
            street: "ALCALA",
            number: "12",
            floor: Some("01"),
            ..Default::default()
        };
        let query = OvcQuery::property_by_address(&address);
        assert_eq!(query.endpoint.path(), "Consulta_DNPLOC");
        let params: HashMap<_, _> = query.params.iter().cloned().collect();
        assert_eq!(params["Sigla"], "CL");
        assert_eq!(params["Planta"], "01");
        assert_eq!(params["Puerta"], "");
    }

    #[test]
    fn test_coordinate_endpoints_use_coordenadas() {
        let query = OvcQuery::nearby_references(-3.7, 40.4, "EPSG:4326");
        assert_eq!(query.endpoint.service(), OvcService::Coordenadas);
        assert_eq!(query.endpoint.path(), "Consulta_RCCOOR_Distancia");
        assert_eq!(query.params[0], ("CoorX", "-3.7".to_string()));
        assert_eq!(OvcEndpoint::PropertyByReference.service(), OvcService::Callejero);
    }
}
