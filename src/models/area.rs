use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Production areas of the workshop floor.
///
/// The string value stored in the database and exchanged over the API is the
/// lowercase area code (`corte`, `bordado`, ...).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::AsRefStr,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Area {
    #[sea_orm(string_value = "corte")]
    Corte,
    #[sea_orm(string_value = "bordado")]
    Bordado,
    #[sea_orm(string_value = "ensamble")]
    Ensamble,
    #[sea_orm(string_value = "plancha")]
    Plancha,
    #[sea_orm(string_value = "calidad")]
    Calidad,
    #[sea_orm(string_value = "envios")]
    Envios,
    #[sea_orm(string_value = "patronaje")]
    Patronaje,
    #[sea_orm(string_value = "almacen")]
    Almacen,
    #[sea_orm(string_value = "diseño")]
    #[serde(rename = "diseño")]
    #[strum(serialize = "diseño")]
    Diseno,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Area {
    /// Area where new orders start unless told otherwise.
    pub const INITIAL: Area = Area::Corte;

    /// Only this area may complete an order.
    pub const TERMINAL: Area = Area::Envios;

    pub const ALL: [Area; 10] = [
        Area::Corte,
        Area::Bordado,
        Area::Ensamble,
        Area::Plancha,
        Area::Calidad,
        Area::Envios,
        Area::Patronaje,
        Area::Almacen,
        Area::Diseno,
        Area::Admin,
    ];

    /// Resolves an area code, ignoring surrounding whitespace and case.
    pub fn from_code(code: &str) -> Result<Self, ServiceError> {
        let normalized = code.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|area| area.code() == normalized)
            .ok_or_else(|| ServiceError::InvalidArea(code.trim().to_string()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Area::Corte => "corte",
            Area::Bordado => "bordado",
            Area::Ensamble => "ensamble",
            Area::Plancha => "plancha",
            Area::Calidad => "calidad",
            Area::Envios => "envios",
            Area::Patronaje => "patronaje",
            Area::Almacen => "almacen",
            Area::Diseno => "diseño",
            Area::Admin => "admin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Area::Corte => "Corte",
            Area::Bordado => "Bordado",
            Area::Ensamble => "Ensamble",
            Area::Plancha => "Plancha/Empaque",
            Area::Calidad => "Calidad",
            Area::Envios => "Envíos",
            Area::Patronaje => "Patronaje",
            Area::Almacen => "Almacén",
            Area::Diseno => "Diseño",
            Area::Admin => "Admin",
        }
    }

    /// Whether pieces may be sent to (or held by) this area.
    pub fn is_transfer_target(&self) -> bool {
        !matches!(self, Area::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Area::Admin)
    }
}

/// Registry entry returned by `GET /areas`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AreaInfo {
    pub code: Area,
    pub display_name: String,
    pub transfer_target: bool,
}

impl From<Area> for AreaInfo {
    fn from(area: Area) -> Self {
        Self {
            code: area,
            display_name: area.display_name().to_string(),
            transfer_target: area.is_transfer_target(),
        }
    }
}

pub fn registry() -> Vec<AreaInfo> {
    Area::ALL.iter().copied().map(AreaInfo::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn codes_resolve_case_insensitively() {
        assert_eq!(Area::from_code("corte").unwrap(), Area::Corte);
        assert_eq!(Area::from_code("  Envios ").unwrap(), Area::Envios);
        assert_eq!(Area::from_code("PLANCHA").unwrap(), Area::Plancha);
        assert_eq!(Area::from_code("Patronaje").unwrap(), Area::Patronaje);
        assert_eq!(Area::from_code("DISEÑO").unwrap(), Area::Diseno);
    }

    #[test]
    fn design_area_keeps_its_spanish_code() {
        assert_eq!(Area::from_code("diseño").unwrap(), Area::Diseno);
        assert_eq!(Area::Diseno.to_string(), "diseño");
        assert_eq!(Area::Diseno.display_name(), "Diseño");
        assert_eq!(serde_json::to_value(Area::Diseno).unwrap(), "diseño");
        assert_eq!(
            serde_json::from_value::<Area>(serde_json::json!("patronaje")).unwrap(),
            Area::Patronaje
        );
        assert_matches!(Area::from_code("diseno"), Err(ServiceError::InvalidArea(_)));
    }

    #[test]
    fn unknown_code_is_invalid_area() {
        assert_matches!(Area::from_code("lavanderia"), Err(ServiceError::InvalidArea(code)) if code == "lavanderia");
        assert_matches!(Area::from_code(""), Err(ServiceError::InvalidArea(_)));
    }

    #[test]
    fn admin_is_not_a_transfer_target() {
        let targets: Vec<Area> = Area::ALL
            .iter()
            .copied()
            .filter(Area::is_transfer_target)
            .collect();
        assert_eq!(targets.len(), 9);
        assert!(!targets.contains(&Area::Admin));
    }

    #[test]
    fn display_names_and_codes_round_trip() {
        for area in Area::ALL {
            assert_eq!(Area::from_code(area.code()).unwrap(), area);
            assert_eq!(area.to_string(), area.code());
        }
        assert_eq!(Area::Plancha.display_name(), "Plancha/Empaque");
        assert_eq!(Area::Envios.display_name(), "Envíos");
    }

    #[test]
    fn registry_lists_every_area() {
        let entries = registry();
        assert_eq!(entries.len(), 10);
        let admin = entries.iter().find(|e| e.code == Area::Admin).unwrap();
        assert!(!admin.transfer_target);
    }
}
