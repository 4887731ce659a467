use prost_types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/fieldsmith.proto");
    println!("cargo:rerun-if-changed=proto");

    let result = tonic_build::configure()
        .build_server(true)
        .compile_protos(&["proto/fieldsmith.proto"], &["proto"]);

    if result.is_ok() {
        return Ok(());
    }

    // protoc is unavailable in this environment; compile from an equivalent
    // FileDescriptorSet mirroring proto/fieldsmith.proto instead.
    let fds = FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("fieldsmith.proto".into()),
            package: Some("fieldsmith".into()),
            syntax: Some("proto3".into()),
            message_type: vec![
                DescriptorProto {
                    name: Some("GenerateFieldsRequest".into()),
                    field: vec![
                        string_field("form_id", 1, "formId"),
                        string_field("prompt", 2, "prompt"),
                    ],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("GenerateFieldsResponse".into()),
                    field: vec![FieldDescriptorProto {
                        name: Some("fields_inserted".into()),
                        number: Some(1),
                        label: Some(Label::Optional as i32),
                        r#type: Some(Type::Uint32 as i32),
                        json_name: Some("fieldsInserted".into()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
            service: vec![ServiceDescriptorProto {
                name: Some("Fieldsmith".into()),
                method: vec![MethodDescriptorProto {
                    name: Some("GenerateFields".into()),
                    input_type: Some(".fieldsmith.GenerateFieldsRequest".into()),
                    output_type: Some(".fieldsmith.GenerateFieldsResponse".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    };

    tonic_build::configure().build_server(true).compile_fds(fds)?;
    Ok(())
}

fn string_field(name: &str, number: i32, json_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::String as i32),
        json_name: Some(json_name.into()),
        ..Default::default()
    }
}
