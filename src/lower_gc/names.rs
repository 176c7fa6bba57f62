//! Deterministic helper-function naming. Every function here is a pure
//! function of its inputs so the body rewriter can reconstruct a name
//! without consulting a shared map.

pub fn struct_new(type_name: &str, with_default: bool) -> String {
    if with_default {
        format!("StructNewWithDefault${type_name}")
    } else {
        format!("StructNew${type_name}")
    }
}

pub fn struct_get(type_name: &str, field: u32) -> String {
    format!("StructGet${type_name}${field}")
}

pub fn struct_set(type_name: &str, field: u32) -> String {
    format!("StructSet${type_name}${field}")
}

pub fn array_new(type_name: &str, with_default: bool) -> String {
    if with_default {
        format!("ArrayNewWithDefault${type_name}")
    } else {
        format!("ArrayNew${type_name}")
    }
}

pub fn array_get(type_name: &str) -> String {
    format!("ArrayGet${type_name}")
}

pub fn array_set(type_name: &str) -> String {
    format!("ArraySet${type_name}")
}

pub const MALLOC: &str = "malloc";
pub const NEXT_MALLOC_GLOBAL: &str = "nextMalloc";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_documented_naming_surface() {
        assert_eq!(struct_new("Point", false), "StructNew$Point");
        assert_eq!(struct_new("Point", true), "StructNewWithDefault$Point");
        assert_eq!(struct_get("Point", 1), "StructGet$Point$1");
        assert_eq!(struct_set("Point", 1), "StructSet$Point$1");
        assert_eq!(array_new("Ints", false), "ArrayNew$Ints");
        assert_eq!(array_new("Ints", true), "ArrayNewWithDefault$Ints");
        assert_eq!(array_get("Ints"), "ArrayGet$Ints");
        assert_eq!(array_set("Ints"), "ArraySet$Ints");
    }
}
