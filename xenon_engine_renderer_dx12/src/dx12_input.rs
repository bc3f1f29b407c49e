/// HLSL input semantics of the vertex and instance elements
///
/// D3D12 input layouts match shader inputs by semantic name and index
/// rather than by location.

use std::ffi::CStr;

use xenon_engine::xenon::backend::InputElement;

/// Semantic name and index an element is bound to
pub fn input_semantic(element: InputElement) -> (&'static CStr, u32) {
    use InputElement as E;

    let location = element.location();
    match element {
        E::VertexPosition => (c"POSITION", 0),
        E::VertexNormal => (c"NORMAL", 0),
        E::VertexTangent => (c"TANGENT", 0),
        E::VertexColor0
        | E::VertexColor1
        | E::VertexColor2
        | E::VertexColor3
        | E::VertexColor4
        | E::VertexColor5
        | E::VertexColor6
        | E::VertexColor7 => (c"COLOR", location - E::VertexColor0.location()),
        E::VertexTextureCoordinate0
        | E::VertexTextureCoordinate1
        | E::VertexTextureCoordinate2
        | E::VertexTextureCoordinate3
        | E::VertexTextureCoordinate4
        | E::VertexTextureCoordinate5
        | E::VertexTextureCoordinate6
        | E::VertexTextureCoordinate7 => (c"TEXCOORD", location - E::VertexTextureCoordinate0.location()),
        E::VertexJointIndices => (c"BLENDINDICES", 0),
        E::VertexJointWeight => (c"BLENDWEIGHT", 0),
        E::InstancePosition => (c"INSTANCE_POSITION", 0),
        E::InstanceRotation => (c"INSTANCE_ROTATION", 0),
        E::InstanceScale => (c"INSTANCE_SCALE", 0),
        E::InstanceID => (c"INSTANCE_ID", 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_semantics() {
        assert_eq!(input_semantic(InputElement::VertexColor0), (c"COLOR", 0));
        assert_eq!(input_semantic(InputElement::VertexColor7), (c"COLOR", 7));
        assert_eq!(input_semantic(InputElement::VertexTextureCoordinate3), (c"TEXCOORD", 3));
    }

    #[test]
    fn test_every_element_has_a_unique_semantic() {
        let mut seen = Vec::new();
        for element in InputElement::ALL {
            let semantic = input_semantic(element);
            assert!(!seen.contains(&semantic), "{:?} reuses {:?}", element, semantic);
            seen.push(semantic);
        }
        assert_eq!(seen.len(), InputElement::ALL.len());
    }
}
