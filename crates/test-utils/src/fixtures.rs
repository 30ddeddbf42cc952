//! Canned upstream payloads for Catastro gateway tests.
//!
//! The documents mirror what the OVC JSON services and the INSPIRE WFS
//! actually return, trimmed to the parts the parsers look at.

/// Reference values used across the suite.
pub mod refs {
    /// Urban parcel in Madrid with several building units.
    pub const URBAN_PARCEL: &str = "1146801VK4714E";

    /// First unit of [`URBAN_PARCEL`], full 20-character form.
    pub const URBAN_UNIT: &str = "1146801VK4714E0001PW";

    /// Rural parcel (province 28, municipality 079, polygon 18, parcel 39).
    pub const RURAL_PARCEL: &str = "28079A01800039";
}

/// XML Schema documents for the schema graph resolver.
///
/// Locations are relative so tests can serve them from any base URL:
/// `root.xsd` includes `parcel-base.xsd` and `missing.xsd`.
pub mod xsd {
    /// DescribeFeatureType answer for `cp:CadastralParcel`.
    pub const ROOT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0"
    xmlns:gml="http://www.opengis.net/gml/3.2"
    targetNamespace="http://inspire.ec.europa.eu/schemas/cp/4.0"
    elementFormDefault="qualified">
  <xs:include schemaLocation="parcel-base.xsd"/>
  <xs:include schemaLocation="missing.xsd"/>
  <xs:element name="CadastralParcel" type="cp:CadastralParcelType" substitutionGroup="gml:AbstractFeature"/>
  <xs:complexType name="CadastralParcelType">
    <xs:complexContent>
      <xs:extension base="cp:AbstractParcelType">
        <xs:sequence>
          <xs:element name="areaValue" type="gml:AreaType" minOccurs="0"/>
          <xs:element name="geometry" type="gml:GeometryPropertyType"/>
          <xs:element name="inspireId" type="base:IdentifierPropertyType"/>
          <xs:element name="label" type="xs:string"/>
        </xs:sequence>
        <xs:attribute name="nilReason" type="gml:NilReasonType"/>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
</xs:schema>
"#;

    /// Base type pulled in by [`ROOT`].
    pub const PARCEL_BASE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0"
    targetNamespace="http://inspire.ec.europa.eu/schemas/cp/4.0">
  <xs:complexType name="AbstractParcelType" abstract="true">
    <xs:sequence>
      <xs:element name="label" type="cp:LabelType"/>
      <xs:element name="nationalCadastralReference" type="xs:string"/>
      <xs:element ref="cp:validFrom"/>
    </xs:sequence>
  </xs:complexType>
  <xs:element name="validFrom" type="xs:dateTime"/>
</xs:schema>
"#;

    /// First half of a cyclic pair: includes [`CYCLE_B`] as `b.xsd`.
    pub const CYCLE_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:t="urn:test">
  <xs:include schemaLocation="b.xsd"/>
  <xs:element name="Thing" type="t:ThingType"/>
  <xs:complexType name="ThingType">
    <xs:complexContent>
      <xs:extension base="t:BaseThingType">
        <xs:sequence>
          <xs:element name="name" type="xs:string"/>
        </xs:sequence>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
</xs:schema>
"#;

    /// Second half of a cyclic pair: includes [`CYCLE_A`] as `a.xsd`.
    pub const CYCLE_B: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:t="urn:test">
  <xs:include schemaLocation="a.xsd#frag"/>
  <xs:complexType name="BaseThingType">
    <xs:sequence>
      <xs:element name="id" type="xs:ID"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>
"#;
}

/// GML feature documents as served by the WFS.
pub mod gml {
    /// GetParcel response in EPSG:4326 (URL form, latitude first).
    pub const PARCEL_4326: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FeatureCollection xmlns="http://www.opengis.net/wfs/2.0"
    xmlns:gml="http://www.opengis.net/gml/3.2"
    xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0"
    xmlns:base="http://inspire.ec.europa.eu/schemas/base/3.3"
    numberMatched="1" numberReturned="1">
  <member>
    <cp:CadastralParcel gml:id="ES.SDGC.CP.1146801VK4714E">
      <cp:areaValue uom="m2">1023</cp:areaValue>
      <cp:beginLifespanVersion>2008-03-04T00:00:00</cp:beginLifespanVersion>
      <cp:geometry>
        <gml:MultiSurface gml:id="MultiSurface_ES.SDGC.CP.1146801VK4714E" srsName="http://www.opengis.net/def/crs/EPSG/0/4326">
          <gml:surfaceMember>
            <gml:Surface gml:id="Surface_ES.SDGC.CP.1146801VK4714E.1" srsName="http://www.opengis.net/def/crs/EPSG/0/4326">
              <gml:patches>
                <gml:PolygonPatch>
                  <gml:exterior>
                    <gml:LinearRing>
                      <gml:posList srsDimension="2" count="5">40.1 -3.7 40.2 -3.7 40.2 -3.6 40.1 -3.6 40.1 -3.7</gml:posList>
                    </gml:LinearRing>
                  </gml:exterior>
                </gml:PolygonPatch>
              </gml:patches>
            </gml:Surface>
          </gml:surfaceMember>
        </gml:MultiSurface>
      </cp:geometry>
      <cp:inspireId>
        <base:Identifier>
          <base:localId>1146801VK4714E</base:localId>
          <base:namespace>ES.SDGC.CP</base:namespace>
        </base:Identifier>
      </cp:inspireId>
      <cp:label>01</cp:label>
      <cp:nationalCadastralReference>1146801VK4714E</cp:nationalCadastralReference>
    </cp:CadastralParcel>
  </member>
</FeatureCollection>
"#;

    /// GetParcel response in ETRS89 / UTM 30N with a hole, ring built from
    /// two curve segments.
    pub const PARCEL_25830: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FeatureCollection xmlns="http://www.opengis.net/wfs/2.0"
    xmlns:gml="http://www.opengis.net/gml/3.2"
    xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0">
  <member>
    <cp:CadastralParcel gml:id="ES.SDGC.CP.1146801VK4714E">
      <cp:geometry>
        <gml:Polygon gml:id="Polygon_1" srsName="urn:ogc:def:crs:EPSG::25830">
          <gml:exterior>
            <gml:Ring>
              <gml:curveMember>
                <gml:Curve>
                  <gml:segments>
                    <gml:LineStringSegment>
                      <gml:posList srsDimension="2">440000 4474000 440100 4474000 440100 4474100</gml:posList>
                    </gml:LineStringSegment>
                    <gml:LineStringSegment>
                      <gml:posList srsDimension="2">440100 4474100 440000 4474100 440000 4474000</gml:posList>
                    </gml:LineStringSegment>
                  </gml:segments>
                </gml:Curve>
              </gml:curveMember>
            </gml:Ring>
          </gml:exterior>
          <gml:interior>
            <gml:LinearRing>
              <gml:posList>440040 4474040 440060 4474040 440060 4474060 440040 4474060 440040 4474040</gml:posList>
            </gml:LinearRing>
          </gml:interior>
        </gml:Polygon>
      </cp:geometry>
    </cp:CadastralParcel>
  </member>
</FeatureCollection>
"#;

    /// Ring with four positions whose last does not repeat the first.
    pub const OPEN_RING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FeatureCollection xmlns="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:cp="http://inspire.ec.europa.eu/schemas/cp/4.0">
  <member>
    <cp:CadastralParcel gml:id="open">
      <cp:geometry>
        <gml:Polygon srsName="urn:ogc:def:crs:EPSG::4326">
          <gml:exterior>
            <gml:LinearRing>
              <gml:posList>40.1 -3.7 40.2 -3.7 40.2 -3.6 40.1 -3.6</gml:posList>
            </gml:LinearRing>
          </gml:exterior>
        </gml:Polygon>
      </cp:geometry>
    </cp:CadastralParcel>
  </member>
  <member>
    <cp:CadastralParcel gml:id="never-reached">
      <cp:label>02</cp:label>
    </cp:CadastralParcel>
  </member>
</FeatureCollection>
"#;

    /// OWS exception the WFS returns for a refused SRS.
    pub const EXCEPTION_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="2.0.0">
  <ows:Exception exceptionCode="InvalidParameterValue" locator="srsName">
    <ows:ExceptionText>El sistema de referencia solicitado no está soportado</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>
"#;
}

/// WFS GetCapabilities documents.
pub mod capabilities {
    pub const WFS_CP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities xmlns:wfs="http://www.opengis.net/wfs/2.0"
    xmlns:ows="http://www.opengis.net/ows/1.1" version="2.0.0">
  <ows:ServiceIdentification>
    <ows:Title>Servicio de descarga de Parcelas Catastrales</ows:Title>
  </ows:ServiceIdentification>
  <wfs:FeatureTypeList>
    <wfs:FeatureType>
      <wfs:Name>CP:CadastralParcel</wfs:Name>
      <wfs:Title>Parcela Catastral</wfs:Title>
      <wfs:DefaultCRS>urn:ogc:def:crs:EPSG::25830</wfs:DefaultCRS>
      <wfs:OtherCRS>urn:ogc:def:crs:EPSG::4326</wfs:OtherCRS>
      <wfs:OtherCRS>urn:ogc:def:crs:EPSG::32628</wfs:OtherCRS>
    </wfs:FeatureType>
    <wfs:FeatureType>
      <wfs:Name>CP:CadastralZoning</wfs:Name>
      <wfs:Title>Zona Catastral</wfs:Title>
      <wfs:DefaultCRS>urn:ogc:def:crs:EPSG::25830</wfs:DefaultCRS>
    </wfs:FeatureType>
  </wfs:FeatureTypeList>
</wfs:WFS_Capabilities>
"#;
}

/// OVC JSON service payloads.
pub mod ovc {
    pub const PROVINCES: &str = r#"{"consulta_provincieroResult":{"control":{"cuprov":3},"provinciero":{"prov":[
{"cpine":"15","np":"A CORUÑA"},{"cpine":"28","np":"MADRID"},{"cpine":"38","np":"SANTA CRUZ DE TENERIFE"}]}}}"#;

    pub const MUNICIPALITIES: &str = r#"{"consulta_municipieroResult":{"control":{"cumun":2},"municipiero":{"muni":[
{"nm":"MADRID","locat":{"cd":"28","cmc":"900"},"loine":{"cp":"28","cm":"79"}},
{"nm":"MAJADAHONDA","locat":{"cd":"28","cmc":"81"},"loine":{"cp":"28","cm":"80"}}]}}}"#;

    pub const STREETS: &str = r#"{"consulta_callejeroResult":{"control":{"cuca":2},"callejero":{"calle":[
{"dir":{"cv":"1191","tv":"CL","nv":"ALCALA"}},{"dir":{"cv":"4321","tv":"PZ","nv":"ALCALA ZAMORA"}}]}}}"#;

    pub const NUMBERS: &str = r#"{"consulta_numereroResult":{"control":{"cunum":1},"numerero":{"nump":
{"pc":{"pc1":"1146801","pc2":"VK4714E"},"num":{"pnp":"12"}}}}}"#;

    /// Consulta_DNPRC for a 14-character reference: list of units.
    pub const DNPRC_PARCEL: &str = r#"{"consulta_dnprcResult":{"control":{"cudnp":2},"lrcdnp":{"rcdnp":[
{"rc":{"pc1":"1146801","pc2":"VK4714E","car":"0001","cc1":"P","cc2":"W"},
 "dt":{"loine":{"cp":"28","cm":"79"},"np":"MADRID","nm":"MADRID"},"ldt":"CL ALCALA 12 Es:1 Pl:01 Pt:A MADRID (MADRID)",
 "debi":{"luso":"Residencial","sfc":"96","cpt":"12,500000","ant":"1965"}},
{"rc":{"pc1":"1146801","pc2":"VK4714E","car":"0002","cc1":"Q","cc2":"E"},
 "ldt":"CL ALCALA 12 Es:1 Pl:01 Pt:B MADRID (MADRID)",
 "debi":{"luso":"Residencial","sfc":"88","cpt":"11,250000","ant":"1965"}}]}}}"#;

    /// Consulta_DNPRC for a 20-character reference: single unit.
    pub const DNPRC_UNIT: &str = r#"{"consulta_dnprcResult":{"control":{"cudnp":1,"cucons":1},"bico":{"bi":
{"idbi":{"cn":"UR","rc":{"pc1":"1146801","pc2":"VK4714E","car":"0001","cc1":"P","cc2":"W"}},
 "ldt":"CL ALCALA 12 Es:1 Pl:01 Pt:A MADRID (MADRID)",
 "debi":{"luso":"Residencial","sfc":"96","cpt":"12,500000","ant":"1965"}},
 "lcons":[{"lcd":"VIVIENDA","dfcons":{"stl":"84"}}]}}}"#;

    pub const ERROR: &str = r#"{"consulta_dnprcResult":{"control":{"cudnp":0,"cuerr":1},"lerr":{"err":[
{"cod":"43","des":"LA REFERENCIA CATASTRAL NO EXISTE"}]}}}"#;

    pub const RCCOOR: &str = r#"{"Consulta_RCCOORResult":{"control":{"cucoor":1},"coordenadas":{"coord":[
{"pc":{"pc1":"1146801","pc2":"VK4714E"},"geo":{"xcen":"-3.6995","ycen":"40.4185","srs":"EPSG:4326"},
 "ldt":"CL ALCALA 12 MADRID (MADRID)"}]}}}"#;

    pub const RCCOOR_DISTANCE: &str = r#"{"Consulta_RCCOOR_DistanciaResult":{"control":{"cucoor":2},"coordenadas_distancias":{"coordd":[
{"geo":{"xcen":"-3.7","ycen":"40.4185","srs":"EPSG:4326"},"lpcd":[
 {"pc":{"pc1":"1146801","pc2":"VK4714E"},"ldt":"CL ALCALA 12 MADRID (MADRID)","dis":"4.21"},
 {"pc":{"pc1":"1146802","pc2":"VK4714E"},"ldt":"CL ALCALA 14 MADRID (MADRID)","dis":"18.70"}]}]}}}"#;
}
