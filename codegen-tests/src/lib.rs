pub mod protobuf_runtime {
    include!(concat!(env!("OUT_DIR"), "/protobuf_runtime.rs"));
}

include!(concat!(env!("OUT_DIR"), "/codegen/test/CodegenTests.pb.rs"));
